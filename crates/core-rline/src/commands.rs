//! The built-in command table.
//!
//! Each entry declares its canonical name, aliases, and the options it
//! accepts; the parser validates `--options` against the entry and the
//! completion engine offers them. Dispatch itself lives with the editor.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    BufChangeNext,
    BufChangePrev,
    BufChangePrevFocused,
    BufChange,
    BufDelete,
    BufDeleteForce,
    Diff,
    DiffBuf,
    EdNew,
    EdNext,
    EdPrev,
    EdPrevFocused,
    Edit,
    EditForce,
    Enew,
    Etail,
    Grep,
    Messages,
    Quit,
    QuitForce,
    Read,
    ReadShell,
    Redraw,
    Scratch,
    Searches,
    Set,
    Shell,
    Split,
    Substitute,
    SubstituteWholeFile,
    Write,
    WriteForce,
    WriteQuit,
    WriteQuitForce,
    WinChangeNext,
    WinChangePrev,
    WinChangePrevFocused,
    BalancedCheck,
    ValidateUtf8,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Declared options; trailing `=` marks string options.
    pub args: &'static [&'static str],
    /// Bare arguments complete as buffer names instead of filenames.
    pub takes_bufname: bool,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        id: CommandId::BufChangeNext,
        name: "bufnext",
        aliases: &["bn"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::BufChangePrev,
        name: "bufprev",
        aliases: &["bp"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::BufChangePrevFocused,
        name: "bufprevfocused",
        aliases: &["b`"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::BufChange,
        name: "buffer",
        aliases: &["b"],
        args: &["--bufname="],
        takes_bufname: true,
    },
    CommandSpec {
        id: CommandId::BufDeleteForce,
        name: "bufdelete!",
        aliases: &["bd!"],
        args: &["--bufname="],
        takes_bufname: true,
    },
    CommandSpec {
        id: CommandId::BufDelete,
        name: "bufdelete",
        aliases: &["bd"],
        args: &["--bufname="],
        takes_bufname: true,
    },
    CommandSpec {
        id: CommandId::Diff,
        name: "diff",
        aliases: &[],
        args: &["--origin"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::DiffBuf,
        name: "diffbuf",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::EdNew,
        name: "ednew",
        aliases: &[],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::EdNext,
        name: "ednext",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::EdPrev,
        name: "edprev",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::EdPrevFocused,
        name: "edprevfocused",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::EditForce,
        name: "edit!",
        aliases: &["e!"],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Edit,
        name: "edit",
        aliases: &["e"],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Enew,
        name: "enew",
        aliases: &[],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Etail,
        name: "etail",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Grep,
        name: "vgrep",
        aliases: &[],
        args: &["--pat=", "--recursive"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Messages,
        name: "messages",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::QuitForce,
        name: "quit!",
        aliases: &["q!"],
        args: &["--global"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Quit,
        name: "quit",
        aliases: &["q"],
        args: &["--global"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::ReadShell,
        name: "r!",
        aliases: &["!"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Read,
        name: "read",
        aliases: &["r"],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Redraw,
        name: "redraw",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Scratch,
        name: "scratch",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Searches,
        name: "searches",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Set,
        name: "set",
        aliases: &[],
        args: &[
            "--ftype=",
            "--tabwidth=",
            "--shiftwidth=",
            "--autosave=",
            "--backupfile",
            "--no-backupfile",
            "--backup-suffix=",
            "--enable-writing",
        ],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Shell,
        name: "!",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Split,
        name: "split",
        aliases: &[],
        args: &["--fname="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::SubstituteWholeFile,
        name: "s%",
        aliases: &[],
        args: &["--pat=", "--sub=", "--global", "--interactive"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Substitute,
        name: "substitute",
        aliases: &["s"],
        args: &["--pat=", "--sub=", "--global", "--interactive", "--range="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WriteQuitForce,
        name: "wq!",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WriteQuit,
        name: "wq",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WriteForce,
        name: "write!",
        aliases: &["w!"],
        args: &["--fname=", "--range=", "--append"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::Write,
        name: "write",
        aliases: &["w"],
        args: &["--fname=", "--range=", "--append"],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WinChangeNext,
        name: "winnext",
        aliases: &["wn"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WinChangePrev,
        name: "winprev",
        aliases: &["wp"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::WinChangePrevFocused,
        name: "winprevfocused",
        aliases: &["w`"],
        args: &[],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::BalancedCheck,
        name: "@balanced_check",
        aliases: &[],
        args: &["--range="],
        takes_bufname: false,
    },
    CommandSpec {
        id: CommandId::ValidateUtf8,
        name: "@validate_utf8",
        aliases: &[],
        args: &[],
        takes_bufname: false,
    },
];

/// Look an exact command name or alias up.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.aliases.contains(&name))
}

/// Command names starting with `prefix`, canonical names only.
pub fn completions(prefix: &str) -> Vec<String> {
    COMMANDS
        .iter()
        .filter(|c| c.name.starts_with(prefix))
        .map(|c| c.name.to_string())
        .collect()
}
