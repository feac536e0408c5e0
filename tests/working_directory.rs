mod common;

use clap::Parser;
use common::write_msg;
use msgextract::{
    BufferConsole, Cli, Config, ExtractionEngine, MessageHandle, MsgEngine, MsgExtract, MsgFile,
    ParserOptions, Result, SaveOptions,
};
use std::cell::RefCell;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

// The working directory is process wide; tests that change it take turns.
static WORKING_DIRECTORY: Mutex<()> = Mutex::new(());

fn lock_working_directory() -> MutexGuard<'static, ()> {
    WORKING_DIRECTORY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine whose save step moves the process to another directory.
struct WanderingEngine {
    elsewhere: PathBuf,
    targets: Rc<RefCell<Vec<PathBuf>>>,
}

struct WanderingHandle {
    name: String,
    elsewhere: PathBuf,
    targets: Rc<RefCell<Vec<PathBuf>>>,
}

impl ExtractionEngine for WanderingEngine {
    type Handle = WanderingHandle;

    fn open(&self, path: &Path, _options: &ParserOptions) -> Result<WanderingHandle> {
        Ok(WanderingHandle {
            name: path.file_stem().unwrap().to_string_lossy().into_owned(),
            elsewhere: self.elsewhere.clone(),
            targets: Rc::clone(&self.targets),
        })
    }
}

impl MessageHandle for WanderingHandle {
    fn primary_text(&self) -> &str {
        ""
    }

    fn save(&mut self, options: &SaveOptions) -> Result<PathBuf> {
        env::set_current_dir(&self.elsewhere)?;

        let target = options.target.path().to_path_buf();
        self.targets.borrow_mut().push(target.clone());

        let output = target.join(format!("{}.txt", self.name));
        fs::write(&output, b"saved")?;
        Ok(output)
    }
}

/// Real `.msg` engine that moves the process elsewhere after every save.
struct RelocatingEngine {
    elsewhere: PathBuf,
}

struct RelocatingHandle {
    inner: MsgFile,
    elsewhere: PathBuf,
}

impl ExtractionEngine for RelocatingEngine {
    type Handle = RelocatingHandle;

    fn open(&self, path: &Path, options: &ParserOptions) -> Result<RelocatingHandle> {
        Ok(RelocatingHandle {
            inner: MsgEngine.open(path, options)?,
            elsewhere: self.elsewhere.clone(),
        })
    }
}

impl MessageHandle for RelocatingHandle {
    fn primary_text(&self) -> &str {
        self.inner.primary_text()
    }

    fn save(&mut self, options: &SaveOptions) -> Result<PathBuf> {
        let written = self.inner.save(options)?;
        env::set_current_dir(&self.elsewhere)?;
        Ok(written)
    }
}

/// Runs two real messages with `args`, starting in `initial` and wandering
/// to `elsewhere` after the first save.
fn extract_two_messages(initial: &Path, elsewhere: &Path, args: &[&str]) -> BufferConsole {
    let inputs = initial.join("inputs");
    fs::create_dir(&inputs).unwrap();
    write_msg(&inputs.join("a.msg"), "First", "one", &[]);
    write_msg(&inputs.join("b.msg"), "Second", "two", &[]);
    let inputs_arg = inputs.to_string_lossy().into_owned();

    let argv = ["msgextract", inputs_arg.as_str()]
        .into_iter()
        .chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).unwrap();

    env::set_current_dir(initial).unwrap();
    let app = MsgExtract::from_cli(&cli, Config::default(), initial).unwrap();

    let engine = RelocatingEngine {
        elsewhere: elsewhere.to_path_buf(),
    };
    let mut console = BufferConsole::new();
    app.extract_with(&engine, &mut console);
    console
}

#[test]
fn relative_output_directory_stays_under_initial_directory() {
    let _guard = lock_working_directory();
    let initial = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let console = extract_two_messages(initial.path(), elsewhere.path(), &["--out", "out"]);

    assert!(console.lines().is_empty(), "{:?}", console.lines());
    let out = initial.path().join("out");
    let first = fs::read_to_string(out.join("First").join("message.txt")).unwrap();
    let second = fs::read_to_string(out.join("Second").join("message.txt")).unwrap();
    assert!(first.contains("Subject: First"));
    assert!(second.contains("Subject: Second"));
    assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
}

#[test]
fn unnamed_archives_stay_in_initial_directory() {
    let _guard = lock_working_directory();
    let initial = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let console = extract_two_messages(initial.path(), elsewhere.path(), &["--zip"]);

    assert!(console.lines().is_empty(), "{:?}", console.lines());
    assert!(initial.path().join("First.zip").is_file());
    assert!(initial.path().join("Second.zip").is_file());
    assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
}

#[test]
fn later_items_ignore_working_directory_changes() {
    let _guard = lock_working_directory();
    let initial = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let cli = Cli::try_parse_from(["msgextract", "first.msg", "second.msg"]).unwrap();
    let app = MsgExtract::from_cli(&cli, Config::default(), initial.path()).unwrap();

    let engine = WanderingEngine {
        elsewhere: elsewhere.path().to_path_buf(),
        targets: Rc::new(RefCell::new(Vec::new())),
    };
    let mut console = BufferConsole::new();
    app.extract_with(&engine, &mut console);

    assert!(console.lines().is_empty(), "{:?}", console.lines());
    assert_eq!(
        *engine.targets.borrow(),
        vec![initial.path().to_path_buf(), initial.path().to_path_buf()]
    );
    assert!(initial.path().join("first.txt").exists());
    assert!(initial.path().join("second.txt").exists());
    assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
}
