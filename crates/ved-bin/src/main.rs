//! The `ved` binary: terminal bring-up, logging, root loop.

use anyhow::Result;
use clap::Parser;
use core_actions::{install_default_actions, main_loop};
use core_config::{Settings, VedDirs};
use core_model::{Editor, LoopOutcome, Root, RootFlow};
use core_term::{Term, TermKeys};
use std::io::stdout;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ved", about = "modal terminal text editor", version)]
struct Args {
    /// Files to open; the first lands in the initial buffer, the rest join
    /// the same frame (cycle with `,n`).
    files: Vec<PathBuf>,
    /// Autosave period in seconds (0 disables).
    #[arg(long)]
    autosave: Option<u64>,
    /// Tab width override for every opened buffer.
    #[arg(long)]
    tabwidth: Option<usize>,
    /// Shift width override for every opened buffer.
    #[arg(long)]
    shiftwidth: Option<usize>,
}

fn build_editor(
    rows: usize,
    cols: usize,
    settings: &Settings,
    dirs: &VedDirs,
    files: &[PathBuf],
) -> Editor {
    let mut ed = Editor::new(rows, cols, Box::new(stdout()));
    ed.settings = settings.clone();
    ed.dirs = dirs.clone();
    ed.history.max_entries = settings.max_num_hist_entries;
    ed.history.load(&dirs.data_dir);
    install_default_actions(&mut ed);
    for (i, file) in files.iter().enumerate() {
        match ed.make_file_buffer(file) {
            Ok(buf) => {
                if i == 0 {
                    let dim = ed.buf().dim;
                    let flags = ed.buf().flags;
                    let mut buf = buf;
                    buf.dim = dim;
                    buf.flags.insert(flags);
                    buf.sync_view();
                    *ed.buf_mut() = buf;
                } else {
                    ed.win_mut().attach(buf, 0);
                }
            }
            Err(e) => ed.msg_error(e.to_string()),
        }
    }
    if files.len() > 1 {
        // focus the first file again after attaching the rest
        ed.win_mut().make_visible(0);
    }
    ed
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dirs = VedDirs::resolve();
    dirs.ensure()?;
    let mut settings = Settings::load(&dirs);
    if let Some(secs) = args.autosave {
        settings.autosave = secs;
    }
    if args.tabwidth.is_some() {
        settings.tabwidth = args.tabwidth;
    }
    if args.shiftwidth.is_some() {
        settings.shiftwidth = args.shiftwidth;
    }

    let appender = tracing_appender::rolling::never(&dirs.data_dir, "ved.log");
    let (writer, _log_guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    info!(target: "bin", ?dirs, "starting");

    let mut term = Term::new()?;
    term.enter()?;
    let (rows, cols) = (term.rows, term.cols);

    let first = build_editor(rows, cols, &settings, &dirs, &args.files);
    let mut root = Root::new(first);
    let mut keys = TermKeys;

    let code = loop {
        let outcome = main_loop(root.cur_mut(), &mut keys);
        if matches!(
            outcome,
            LoopOutcome::Exit | LoopOutcome::ExitAll | LoopOutcome::ExitAllForce
        ) {
            // histories are rewritten whole at shutdown
            let ed = root.cur_mut();
            if let Err(e) = ed.history.flush(&ed.dirs.data_dir) {
                tracing::warn!(target: "bin", error = %e, "history flush failed");
            }
        }
        let settings = settings.clone();
        let dirs_for_new = dirs.clone();
        let flow = root.handle(outcome, |fname| {
            let files: Vec<PathBuf> = fname.cloned().into_iter().collect();
            build_editor(rows, cols, &settings, &dirs_for_new, &files)
        });
        match flow {
            RootFlow::Continue => {}
            RootFlow::Suspend => {
                // cooperative suspend: drop raw mode until the next key
                term.leave()?;
                term.enter()?;
            }
            RootFlow::Quit(code) => break code,
        }
    };
    term.leave()?;
    info!(target: "bin", code, "exiting");
    std::process::exit(code);
}
