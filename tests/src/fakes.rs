use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use netsift_common::config::Config;
use netsift_common::error::ScanError;
use netsift_common::system::SystemRepository;
use netsift_common::vendors::VendorRepository;
use netsift_core::modal::ModalQueueManager;
use netsift_core::pipeline::ScanPipeline;
use netsift_core::prompt::Prompter;
use netsift_core::surface::{ConfirmPrompt, InputPrompt, Notice, ResultSummary, StyledLine, Surface};
use netsift_core::tools::{Capability, Invocation, OutputLine, ToolRun, ToolRunner};
use netsift_core::ui;
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

/*************************************************************
                        Surface
**************************************************************/

/// Answers prompts from a script and records everything it is asked to draw.
///
/// Running out of scripted answers backs out of the prompt.
#[derive(Default)]
pub struct ScriptedSurface {
    inputs: Mutex<VecDeque<Option<String>>>,
    confirms: Mutex<VecDeque<Option<bool>>>,
    events: Mutex<Vec<String>>,
    cancel: Mutex<Option<CancellationToken>>,
    summary: Mutex<Option<ResultSummary>>,
    drawing: AtomicUsize,
    max_drawing: AtomicUsize,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, input: &str) -> Self {
        self.inputs.lock().unwrap().push_back(Some(input.to_string()));
        self
    }

    pub fn back_out(self) -> Self {
        self.inputs.lock().unwrap().push_back(None);
        self
    }

    pub fn confirm(self, answer: bool) -> Self {
        self.confirms.lock().unwrap().push_back(Some(answer));
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn has_event(&self, prefix: &str) -> bool {
        self.events().iter().any(|e| e.starts_with(prefix))
    }

    pub fn summary(&self) -> Option<ResultSummary> {
        self.summary.lock().unwrap().clone()
    }

    /// Presses "cancel" in the open output view.
    pub fn cancel_output(&self) {
        if let Some(token) = self.cancel.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    /// Most modals that were ever on screen at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_drawing.load(Ordering::SeqCst)
    }

    fn draw<T>(&self, event: String, f: impl FnOnce() -> T) -> T {
        let now = self.drawing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_drawing.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(event);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let out = f();
        self.drawing.fetch_sub(1, Ordering::SeqCst);
        out
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Surface for ScriptedSurface {
    fn input(&self, prompt: &InputPrompt) -> Option<String> {
        self.draw(format!("input:{}={}", prompt.label, prompt.initial), || {
            self.inputs.lock().unwrap().pop_front().flatten()
        })
    }

    fn confirm(&self, prompt: &ConfirmPrompt) -> Option<bool> {
        self.draw(format!("confirm:{}", prompt.message), || {
            self.confirms.lock().unwrap().pop_front().flatten()
        })
    }

    fn notice(&self, notice: &Notice) {
        self.draw(format!("notice:{}:{}", notice.title, notice.message), || ())
    }

    fn open_output(&self, title: &str, cancel: CancellationToken) {
        *self.cancel.lock().unwrap() = Some(cancel);
        self.push(format!("open:{title}"));
    }

    fn append_output(&self, line: &StyledLine) {
        self.push(format!("line:{}", line.text));
    }

    fn close_output(&self, banner: &Notice) {
        self.push(format!("close:{}:{}", banner.title, banner.message));
    }

    fn results(&self, summary: &ResultSummary) {
        *self.summary.lock().unwrap() = Some(summary.clone());
        self.push(format!("results:{}", summary.host_count()));
    }
}

/*************************************************************
                        Tool runner
**************************************************************/

enum Script {
    Output { stdout: Vec<String>, file: Option<String> },
    Fail(String),
    Hang,
}

/// Stands in for the external tools. Capabilities without a script print
/// nothing and exit cleanly.
#[derive(Default)]
pub struct FakeRunner {
    scripts: HashMap<Capability, Script>,
    ptr: HashMap<IpAddr, String>,
    calls: Mutex<Vec<Capability>>,
    obstructions: Mutex<Vec<(Capability, PathBuf)>>,
    /// Signalled when a hanging tool has started.
    pub started: Arc<Notify>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printing(mut self, capability: Capability, lines: &[&str]) -> Self {
        self.scripts.insert(
            capability,
            Script::Output {
                stdout: lines.iter().map(|l| l.to_string()).collect(),
                file: None,
            },
        );
        self
    }

    /// Writes `content` to the tool's `-oG`/`-oX` output file.
    pub fn writing(mut self, capability: Capability, content: &str) -> Self {
        self.scripts.insert(
            capability,
            Script::Output {
                stdout: Vec::new(),
                file: Some(content.to_string()),
            },
        );
        self
    }

    pub fn failing(mut self, capability: Capability, reason: &str) -> Self {
        self.scripts.insert(capability, Script::Fail(reason.to_string()));
        self
    }

    /// Runs until cancelled.
    pub fn hanging(mut self, capability: Capability) -> Self {
        self.scripts.insert(capability, Script::Hang);
        self
    }

    pub fn resolving(mut self, addr: &str, name: &str) -> Self {
        self.ptr.insert(addr.parse().unwrap(), name.to_string());
        self
    }

    /// Puts a directory at `path` when `capability` runs, so whatever
    /// later tries to write a file there fails.
    pub fn obstruct_on(&self, capability: Capability, path: PathBuf) {
        self.obstructions.lock().unwrap().push((capability, path));
    }

    pub fn calls(&self) -> Vec<Capability> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ran(&self, capability: Capability) -> bool {
        self.calls().contains(&capability)
    }
}

fn output_file(invocation: &Invocation) -> Option<PathBuf> {
    invocation
        .args
        .iter()
        .position(|arg| arg == "-oG" || arg == "-oX")
        .and_then(|idx| invocation.args.get(idx + 1))
        .map(PathBuf::from)
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation, cancel: CancellationToken) -> Result<ToolRun, ScanError> {
        self.calls.lock().unwrap().push(invocation.capability);
        let obstructed: Vec<PathBuf> = self
            .obstructions
            .lock()
            .unwrap()
            .iter()
            .filter(|(capability, _)| *capability == invocation.capability)
            .map(|(_, path)| path.clone())
            .collect();
        for path in obstructed {
            std::fs::create_dir_all(&path).unwrap();
        }
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        if invocation.capability == Capability::ReverseLookup {
            let name = invocation
                .args
                .iter()
                .find_map(|arg| arg.parse::<IpAddr>().ok())
                .and_then(|addr| self.ptr.get(&addr).cloned());
            let stdout = name.map(OutputLine::Stdout).into_iter().collect();
            return Ok(ToolRun::completed(stdout, Ok(())));
        }

        match self.scripts.get(&invocation.capability) {
            None => Ok(ToolRun::completed(Vec::new(), Ok(()))),
            Some(Script::Output { stdout, file }) => {
                if let (Some(content), Some(path)) = (file, output_file(invocation)) {
                    tokio::fs::write(&path, content)
                        .await
                        .map_err(|e| ScanError::io_at("write", &path, e))?;
                }
                let lines = stdout.iter().cloned().map(OutputLine::Stdout).collect();
                Ok(ToolRun::completed(lines, Ok(())))
            }
            Some(Script::Fail(reason)) => Ok(ToolRun::completed(
                vec![OutputLine::Stderr(reason.clone())],
                Err(ScanError::tool_failed(&invocation.program, reason.clone())),
            )),
            Some(Script::Hang) => {
                let (tx, rx) = mpsc::channel(1);
                self.started.notify_one();
                let status = tokio::spawn(async move {
                    let _ = tx.send(OutputLine::Stdout("sweeping...".into())).await;
                    cancel.cancelled().await;
                    drop(tx);
                    Err(ScanError::Cancelled)
                });
                Ok(ToolRun::new(rx, status))
            }
        }
    }
}

/*************************************************************
                     Repositories
**************************************************************/

pub struct FixedSystem(pub Vec<NetworkInterface>);

impl SystemRepository for FixedSystem {
    fn get_network_interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>> {
        Ok(self.0.clone())
    }
}

pub struct NoVendors;

impl VendorRepository for NoVendors {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        None
    }
}

/*************************************************************
                        Harness
**************************************************************/

pub struct Harness {
    pub pipeline: Arc<ScanPipeline>,
    pub surface: Arc<ScriptedSurface>,
    pub runner: Arc<FakeRunner>,
    pub workdir: tempfile::TempDir,
}

impl Harness {
    pub fn new(surface: ScriptedSurface, runner: FakeRunner, interfaces: Vec<NetworkInterface>) -> Self {
        let workdir = tempfile::tempdir().unwrap();
        let config = Config {
            working_directory: workdir.path().to_path_buf(),
            kill_grace_millis: 200,
            ..Config::default()
        };

        let (dispatcher, ui_loop) = ui::channel();
        ui_loop.spawn().unwrap();

        let surface = Arc::new(surface);
        let runner = Arc::new(runner);
        let prompter = Prompter::new(ModalQueueManager::new(dispatcher), surface.clone());
        let pipeline = Arc::new(ScanPipeline::new(
            prompter,
            runner.clone(),
            Arc::new(FixedSystem(interfaces)),
            Arc::new(NoVendors),
            Arc::new(config),
        ));

        Self {
            pipeline,
            surface,
            runner,
            workdir,
        }
    }

    pub fn session_dir(&self, name: &str) -> PathBuf {
        self.workdir.path().join("Hostfiles").join(name)
    }
}

/// Every address listed in the category files of `dir`, with duplicates kept.
pub fn categorized_addresses(dir: &std::path::Path) -> Vec<String> {
    netsift_common::host::Category::ALL
        .iter()
        .map(|category| dir.join(category.file_name()))
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .flat_map(|raw| raw.lines().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

pub fn unique(addrs: &[String]) -> HashSet<String> {
    addrs.iter().cloned().collect()
}
