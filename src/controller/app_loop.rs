use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::AppConfig;
use crate::controller::input::{InputState, Key};
use crate::controller::ready::ReadySignal;
use crate::controller::timed_loop::{TimedLoop, MIN_LOOP_INTERVAL};
use crate::controller::CameraController;
use crate::error::AppError;
use crate::model::{Camera, Projection};
use crate::ui::{self, FrameStats};
use crate::view::{AppWindow, Platform};

#[cfg(not(test))]
const SLOW_START_WARNING: Duration = Duration::from_secs(2);
#[cfg(test)]
const SLOW_START_WARNING: Duration = Duration::from_millis(20);

/// Hooks an application plugs into the [`Runner`].
///
/// `update` runs on the update thread, everything else on the thread that
/// owns the window and graphics context. State shared between the two is the
/// implementor's to synchronize.
pub trait Application<G: ?Sized>: Send + Sync + 'static {
    /// Called once the window and context exist, before the update thread starts
    fn init(&self, _gfx: &G, _camera: &mut Camera) -> Result<(), AppError> {
        Ok(())
    }

    /// Called after the update thread has been joined, before the window goes away
    fn stop(&self, _gfx: &G) {}

    fn update(&self, _timestep: f32) {}

    fn render(&self, _gfx: &G, _camera: &Camera) {}

    fn update_ui(&self, _ctx: &egui::Context) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

/// Clears the shared running flag from any thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    pub loop_interval: Duration,
    pub debug_overlay: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_interval: MIN_LOOP_INTERVAL,
            debug_overlay: true,
        }
    }
}

impl From<&AppConfig> for RunnerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            loop_interval: config.loop_interval,
            debug_overlay: config.debug_overlay,
        }
    }
}

/// Marks the update loop as finished, even when it unwinds.
///
/// Clearing `running` takes the main loop down with a panicked update
/// thread; notifying keeps the startup wait from blocking forever when the
/// loop exits before its first update.
struct UpdateExit<'a> {
    running: &'a AtomicBool,
    ready: &'a ReadySignal,
}

impl Drop for UpdateExit<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.ready.notify();
    }
}

/// Owns the run loop: one update thread plus the window thread it runs on
pub struct Runner {
    config: RunnerConfig,
    running: Arc<AtomicBool>,
    state: RunState,
    camera: Camera,
    camera_controller: CameraController,
    input: InputState,
    stats: FrameStats,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            state: RunState::NotStarted,
            camera: Camera::default(),
            camera_controller: CameraController::new(),
            input: InputState::new(),
            stats: FrameStats::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { running: self.running.clone() }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Open a window, run `app` until the window closes or a stop is
    /// requested, then tear everything down. A runner runs at most once.
    pub fn run<P, A>(&mut self, platform: &mut P, app: Arc<A>) -> Result<(), AppError>
    where
        P: Platform,
        A: Application<<P::Window as AppWindow>::Gfx>,
    {
        if self.state != RunState::NotStarted {
            return Err(AppError::AlreadyRun);
        }

        self.running.store(true, Ordering::SeqCst);
        self.state = RunState::Running;

        let mut window = match self.setup(platform, app.as_ref()) {
            Ok(window) => window,
            Err(err) => {
                tracing::error!("setup failed: {}", err);
                self.running.store(false, Ordering::SeqCst);
                self.state = RunState::Stopped;
                return Err(err);
            }
        };

        let ready = Arc::new(ReadySignal::new());
        let update_thread = {
            let running = self.running.clone();
            let ready = ready.clone();
            let app = app.clone();
            let timed = TimedLoop::new(self.config.loop_interval);

            thread::Builder::new().name("update".into()).spawn(move || {
                let _exit = UpdateExit { running: &running, ready: &ready };
                let iterations = timed.run(
                    || running.load(Ordering::SeqCst),
                    |dt| {
                        app.update(dt);
                        ready.notify();
                    },
                );
                tracing::debug!(iterations, "update loop finished");
            })
        };

        let update_thread = match update_thread {
            Ok(handle) => handle,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                self.teardown(window, app.as_ref());
                return Err(AppError::Spawn(err));
            }
        };

        if !ready.wait_timeout(SLOW_START_WARNING) {
            tracing::warn!("update thread has not finished its first update after {:?}", SLOW_START_WARNING);
            ready.wait();
        }
        tracing::info!("update thread ready, entering main loop");

        let frames = self.main_loop(&mut window, app.as_ref());

        self.running.store(false, Ordering::SeqCst);
        self.state = RunState::Stopping;
        tracing::info!(frames, "main loop finished, stopping");

        let joined = update_thread.join();
        self.teardown(window, app.as_ref());

        match joined {
            Ok(()) => Ok(()),
            Err(_) => Err(AppError::UpdateThreadPanicked),
        }
    }

    fn setup<P, A>(&mut self, platform: &mut P, app: &A) -> Result<P::Window, AppError>
    where
        P: Platform,
        A: Application<<P::Window as AppWindow>::Gfx>,
    {
        let window = platform.open()?;

        let (width, height) = window.framebuffer_size();
        self.camera.set_projection(Projection::Perspective);
        self.camera.set_viewport(width, height);

        if let Err(err) = app.init(window.gfx(), &mut self.camera) {
            window.teardown();
            return Err(err);
        }
        Ok(window)
    }

    fn main_loop<W, A>(&mut self, window: &mut W, app: &A) -> u64
    where
        W: AppWindow,
        A: Application<W::Gfx>,
    {
        let timed = TimedLoop::new(self.config.loop_interval);
        let running = self.running.clone();
        let open = Cell::new(window.is_open());
        tracing::debug!(min_interval = ?timed.min_interval(), "main loop starting");

        timed.run(
            || open.get() && running.load(Ordering::SeqCst),
            |dt| {
                self.frame(&mut *window, app, dt);
                open.set(window.is_open());
            },
        )
    }

    fn frame<W, A>(&mut self, window: &mut W, app: &A, dt: f32)
    where
        W: AppWindow,
        A: Application<W::Gfx>,
    {
        self.stats.tick(dt);
        window.poll_events(&mut self.input);

        if let Some((width, height)) = self.input.take_resize() {
            self.camera.set_viewport(width, height);
        }

        for key in self.input.take_pressed() {
            self.handle_hotkey(window, key);
        }

        if self.input.look_active() {
            self.camera_controller.update(&mut self.camera, &mut self.input, dt);
        } else {
            self.input.consume_look();
        }

        let camera = &self.camera;
        let stats = &self.stats;
        let debug_overlay = self.config.debug_overlay;

        window.run_ui(&mut |ctx| {
            if debug_overlay {
                ui::draw_debug_window(ctx, camera, stats);
            }
            app.update_ui(ctx);
        });
        window.render_frame(&mut |gfx| app.render(gfx, camera));
    }

    fn handle_hotkey<W: AppWindow>(&mut self, window: &mut W, key: Key) {
        match key {
            Key::Escape => window.request_close(),
            Key::P => {
                self.camera.toggle_projection();
                tracing::debug!(projection = ?self.camera.projection(), "projection toggled");
            }
            Key::O => {
                let c = &self.camera;
                tracing::info!(
                    x = c.position.x,
                    y = c.position.y,
                    z = c.position.z,
                    yaw = c.yaw,
                    pitch = c.pitch,
                    "camera"
                );
            }
            _ => {}
        }
    }

    fn teardown<W, A>(&mut self, window: W, app: &A)
    where
        W: AppWindow,
        A: Application<W::Gfx>,
    {
        app.stop(window.gfx());
        window.teardown();
        self.state = RunState::Stopped;
        tracing::info!("stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::{InputEvent, MouseButton};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct WindowLog {
        frames: AtomicUsize,
        ui_frames: AtomicUsize,
        torn_down: AtomicBool,
    }

    struct HeadlessWindow {
        log: Arc<WindowLog>,
        close_after: Option<usize>,
        open: bool,
        script: VecDeque<Vec<InputEvent>>,
        ui: egui::Context,
    }

    impl AppWindow for HeadlessWindow {
        type Gfx = ();

        fn gfx(&self) -> &() {
            &()
        }

        fn framebuffer_size(&self) -> (u32, u32) {
            (640, 480)
        }

        fn poll_events(&mut self, input: &mut InputState) {
            if let Some(events) = self.script.pop_front() {
                for event in &events {
                    input.process_event(event);
                }
            }
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn request_close(&mut self) {
            self.open = false;
        }

        fn run_ui(&mut self, build: &mut dyn FnMut(&egui::Context)) {
            let _ = self.ui.run(egui::RawInput::default(), |ctx| build(ctx));
            self.log.ui_frames.fetch_add(1, Ordering::SeqCst);
        }

        fn render_frame(&mut self, scene: &mut dyn FnMut(&())) {
            scene(&());
            let frames = self.log.frames.fetch_add(1, Ordering::SeqCst) + 1;
            if self.close_after.is_some_and(|n| frames >= n) {
                self.open = false;
            }
        }

        fn teardown(self) {
            self.log.torn_down.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct HeadlessPlatform {
        log: Arc<WindowLog>,
        close_after: Option<usize>,
        script: Vec<Vec<InputEvent>>,
        fail: bool,
    }

    impl Platform for HeadlessPlatform {
        type Window = HeadlessWindow;

        fn open(&mut self) -> Result<HeadlessWindow, AppError> {
            if self.fail {
                return Err(AppError::Window("no display".into()));
            }
            Ok(HeadlessWindow {
                log: self.log.clone(),
                close_after: self.close_after,
                open: true,
                script: std::mem::take(&mut self.script).into(),
                ui: egui::Context::default(),
            })
        }
    }

    #[derive(Default)]
    struct CountingApp {
        inits: AtomicUsize,
        stops: AtomicUsize,
        updates: AtomicUsize,
        renders: AtomicUsize,
        ui_calls: AtomicUsize,
        stop_on_init: Mutex<Option<StopHandle>>,
        fail_init: bool,
        panic_on_update: bool,
        first_update_delay: Option<Duration>,
    }

    impl Application<()> for CountingApp {
        fn init(&self, _gfx: &(), camera: &mut Camera) -> Result<(), AppError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            assert_eq!(camera.viewport(), glam::UVec2::new(640, 480));
            if let Some(stop) = self.stop_on_init.lock().take() {
                stop.request_stop();
            }
            if self.fail_init {
                return Err(AppError::Ui("init refused".into()));
            }
            Ok(())
        }

        fn stop(&self, _gfx: &()) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn update(&self, _timestep: f32) {
            if self.panic_on_update {
                panic!("update exploded");
            }
            if let Some(delay) = self.first_update_delay.filter(|_| self.updates.load(Ordering::SeqCst) == 0) {
                thread::sleep(delay);
            }
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn render(&self, _gfx: &(), _camera: &Camera) {
            self.renders.fetch_add(1, Ordering::SeqCst);
        }

        fn update_ui(&self, _ctx: &egui::Context) {
            self.ui_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_runs_until_window_closes() {
        let mut platform = HeadlessPlatform { close_after: Some(5), ..Default::default() };
        let log = platform.log.clone();
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());

        runner.run(&mut platform, app.clone()).unwrap();

        assert_eq!(runner.state(), RunState::Stopped);
        assert!(!runner.stop_handle().is_running());
        assert_eq!(log.frames.load(Ordering::SeqCst), 5);
        assert_eq!(app.renders.load(Ordering::SeqCst), 5);
        assert_eq!(app.ui_calls.load(Ordering::SeqCst), 5);
        assert!(app.updates.load(Ordering::SeqCst) >= 1);
        assert_eq!(app.inits.load(Ordering::SeqCst), 1);
        assert_eq!(app.stops.load(Ordering::SeqCst), 1);
        assert!(log.torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_before_first_update_does_not_deadlock() {
        let mut platform = HeadlessPlatform::default();
        let log = platform.log.clone();
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());
        *app.stop_on_init.lock() = Some(runner.stop_handle());

        runner.run(&mut platform, app.clone()).unwrap();

        assert_eq!(runner.state(), RunState::Stopped);
        assert_eq!(app.updates.load(Ordering::SeqCst), 0);
        assert_eq!(log.frames.load(Ordering::SeqCst), 0);
        assert_eq!(app.stops.load(Ordering::SeqCst), 1);
        assert!(log.torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_slow_first_update_still_starts_main_loop() {
        let mut platform = HeadlessPlatform { close_after: Some(3), ..Default::default() };
        let log = platform.log.clone();
        let app = Arc::new(CountingApp {
            first_update_delay: Some(SLOW_START_WARNING * 4),
            ..Default::default()
        });
        let mut runner = Runner::new(RunnerConfig::default());

        runner.run(&mut platform, app.clone()).unwrap();

        assert_eq!(runner.state(), RunState::Stopped);
        assert!(app.updates.load(Ordering::SeqCst) >= 1);
        assert_eq!(log.frames.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let mut platform = HeadlessPlatform::default();
        let log = platform.log.clone();
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());
        let stop = runner.stop_handle();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stop.request_stop();
        });

        runner.run(&mut platform, app.clone()).unwrap();
        stopper.join().unwrap();

        assert_eq!(runner.state(), RunState::Stopped);
        assert!(log.frames.load(Ordering::SeqCst) > 0);
        assert!(app.updates.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_second_run_is_rejected() {
        let mut platform = HeadlessPlatform { close_after: Some(1), ..Default::default() };
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());

        runner.run(&mut platform, app.clone()).unwrap();
        let err = runner.run(&mut platform, app.clone()).unwrap_err();

        assert!(matches!(err, AppError::AlreadyRun));
        assert_eq!(app.inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_propagates() {
        let mut platform = HeadlessPlatform { fail: true, ..Default::default() };
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());

        let err = runner.run(&mut platform, app.clone()).unwrap_err();

        assert!(matches!(err, AppError::Window(_)));
        assert_eq!(runner.state(), RunState::Stopped);
        assert!(!runner.stop_handle().is_running());
        assert_eq!(app.inits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_init_failure_tears_window_down() {
        let mut platform = HeadlessPlatform::default();
        let log = platform.log.clone();
        let app = Arc::new(CountingApp { fail_init: true, ..Default::default() });
        let mut runner = Runner::new(RunnerConfig::default());

        assert!(runner.run(&mut platform, app.clone()).is_err());
        assert!(log.torn_down.load(Ordering::SeqCst));
        assert_eq!(app.stops.load(Ordering::SeqCst), 0);
        assert_eq!(app.updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_update_panic_is_reported() {
        let mut platform = HeadlessPlatform::default();
        let log = platform.log.clone();
        let app = Arc::new(CountingApp { panic_on_update: true, ..Default::default() });
        let mut runner = Runner::new(RunnerConfig::default());

        let err = runner.run(&mut platform, app.clone()).unwrap_err();

        assert!(matches!(err, AppError::UpdateThreadPanicked));
        assert_eq!(runner.state(), RunState::Stopped);
        assert!(log.torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hotkeys_toggle_projection_and_close() {
        let mut platform = HeadlessPlatform {
            script: vec![
                vec![InputEvent::KeyDown(Key::P)],
                vec![InputEvent::KeyUp(Key::P), InputEvent::KeyDown(Key::O)],
                vec![InputEvent::KeyDown(Key::Escape)],
            ],
            ..Default::default()
        };
        let log = platform.log.clone();
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());

        runner.run(&mut platform, app).unwrap();

        assert_eq!(runner.camera().projection(), Projection::Orthographic);
        assert_eq!(log.frames.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_camera_moves_only_while_looking() {
        let mut platform = HeadlessPlatform {
            script: vec![
                // cursor not grabbed yet: ignored
                vec![InputEvent::KeyDown(Key::W), InputEvent::MouseMove { dx: 50.0, dy: 0.0 }],
                vec![
                    InputEvent::PointerLockChanged { locked: true },
                    InputEvent::MouseButton { button: MouseButton::Right, pressed: true },
                    InputEvent::MouseMove { dx: 100.0, dy: 0.0 },
                ],
                vec![InputEvent::KeyDown(Key::Escape)],
            ],
            ..Default::default()
        };
        let app = Arc::new(CountingApp::default());
        let mut runner = Runner::new(RunnerConfig::default());

        runner.run(&mut platform, app).unwrap();

        assert!((runner.camera().yaw - 0.3).abs() < 1e-4);
        assert!(runner.camera().position.length() > 0.0);
    }
}
