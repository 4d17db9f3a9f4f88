//! Shader hot-reload demo
//!
//! Runs the reload loop headlessly: a logging stand-in takes the place of a
//! real graphics backend, so the demo works anywhere. Start it, edit
//! `shaders/vert.glsl` or `shaders/frag.glsl`, and watch the program swap —
//! or stay on the last good version when an edit breaks compilation
//! (putting `#error` anywhere in a source is the quickest way to try that).

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use ember_engine::config::{AppConfig, Config};
use ember_engine::memory::Arena;
use ember_engine::shader::{
    CompileFailed, LinkFailed, MtimeWatcher, ProgramHandle, ShaderBackend, ShaderError,
    ShaderHandle, ShaderManager, ShaderStage,
};

const CONFIG_PATH: &str = "hotload.toml";

/// How often the watcher is polled, in loop ticks. A 60 fps host would
/// check about once a second; this loop ticks slower, so a small divisor
/// gives a similar cadence.
const POLL_EVERY: u32 = 5;

const VERT_STARTER: &str = include_str!("../shaders/vert.glsl");
const FRAG_STARTER: &str = include_str!("../shaders/frag.glsl");

/// Stand-in for a real graphics backend: accepts any source that does not
/// contain `#error`, mints sequential handles and logs every operation.
#[derive(Default)]
struct PrintBackend {
    next_handle: u32,
    last_log: String,
    current: Option<ProgramHandle>,
}

impl ShaderBackend for PrintBackend {
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &[u8],
    ) -> Result<ShaderHandle, CompileFailed> {
        if source.windows(6).any(|w| w == b"#error") {
            self.last_log = format!("{stage:?} shader: #error directive present");
            return Err(CompileFailed);
        }
        self.next_handle += 1;
        log::debug!(
            "compiled {stage:?} shader ({} bytes) -> {}",
            source.len(),
            self.next_handle
        );
        Ok(ShaderHandle::new(self.next_handle))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, LinkFailed> {
        self.next_handle += 1;
        log::debug!(
            "linked program {} from shaders {} + {}",
            self.next_handle,
            vertex.raw(),
            fragment.raw()
        );
        Ok(ProgramHandle::new(self.next_handle))
    }

    fn info_log(&mut self, buf: &mut [u8]) -> usize {
        let text = self.last_log.as_bytes();
        let n = text.len().min(buf.len());
        buf[..n].copy_from_slice(&text[..n]);
        n
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        log::debug!("deleted shader {}", shader.raw());
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        log::debug!("deleted program {}", program.raw());
    }

    fn use_program(&mut self, program: ProgramHandle) {
        match self.current.replace(program) {
            Some(previous) => log::debug!("program {} -> {}", previous.raw(), program.raw()),
            None => log::debug!("using program {}", program.raw()),
        }
    }
}

/// Writes the starter source if nothing exists at `path` yet.
fn ensure_source(path: &str, starter: &str) -> std::io::Result<()> {
    let path = Path::new(path);
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    log::info!("writing starter shader source to `{}`", path.display());
    fs::write(path, starter)
}

fn report(err: &ShaderError, scratch: &Arena<'_>) {
    match err.log() {
        Some(log) => {
            let text = String::from_utf8_lossy(scratch.bytes(log));
            log::error!("{err}: {text}");
        }
        None => log::error!("{err}"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ember_engine::foundation::logging::init_with_default("info");

    let config = match AppConfig::load_from_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(_) => {
            log::info!("no `{CONFIG_PATH}` found, using defaults");
            AppConfig::default()
        }
    };
    ensure_source(&config.shader.vertex_shader_path, VERT_STARTER)?;
    ensure_source(&config.shader.fragment_shader_path, FRAG_STARTER)?;

    // One arena for startup-lifetime data, one cleared every tick — the
    // same split a rendering host would use for persistent and frame state.
    let mut persist_buf = vec![0u8; config.memory.persist_capacity].into_boxed_slice();
    let mut persist = Arena::new(&mut persist_buf);
    let mut frame_buf = vec![0u8; config.memory.frame_capacity].into_boxed_slice();
    let mut frame = Arena::new(&mut frame_buf);

    let mut backend = PrintBackend::default();
    let mut shaders = match ShaderManager::new(
        &config.shader.vertex_shader_path,
        &config.shader.fragment_shader_path,
        MtimeWatcher::new(),
        &mut backend,
        &mut persist,
    ) {
        Ok(shaders) => shaders,
        Err(err) => {
            report(&err, &persist);
            return Err(err.into());
        }
    };

    let program = match shaders.program(&mut backend, &mut persist) {
        Ok(program) => program,
        Err(err) => {
            report(&err, &persist);
            return Err(err.into());
        }
    };
    backend.use_program(program);
    log::info!(
        "serving program {} — edit `{}` or `{}` to trigger a reload, Ctrl-C to quit",
        program.raw(),
        shaders.vertex_path().display(),
        shaders.fragment_path().display()
    );

    let mut tick: u32 = 0;
    loop {
        frame.clear();
        tick = tick.wrapping_add(1);
        if tick % POLL_EVERY == 0 {
            match shaders.reload_if_needed(&mut backend, &mut frame) {
                Ok(true) => match shaders.program(&mut backend, &mut frame) {
                    Ok(program) => log::info!("now serving program {}", program.raw()),
                    Err(err) => report(&err, &frame),
                },
                Ok(false) => {}
                Err(err) => report(&err, &frame),
            }
        }
        thread::sleep(Duration::from_millis(200));
    }
}
