// SPDX-License-Identifier: MIT

use std::io::{self, BufRead, Write};

use colored::Colorize;
use simfs::prelude::*;

use crate::config::ShellConfig;
use crate::log_verbose;

/// Verbs with their usage line, in the order `help` lists them.
const COMMANDS: &[(&str, &str)] = &[
    ("format", "Usage: format"),
    ("create", "Usage: create <file>"),
    ("cat", "Usage: cat <file>"),
    ("ls", "Usage: ls [dirpath]"),
    ("cp", "Usage: cp <sourcepath> <destpath>"),
    ("mv", "Usage: mv <sourcepath> <destpath>"),
    ("rm", "Usage: rm <path>"),
    ("append", "Usage: append <filepath1> <filepath2>"),
    ("mkdir", "Usage: mkdir <dirpath>"),
    ("cd", "Usage: cd <dirpath>"),
    ("pwd", "Usage: pwd"),
    ("chmod", "Usage: chmod <accessrights> <filepath>"),
    ("stat", "Usage: stat <path>"),
    ("df", "Usage: df"),
    ("fsck", "Usage: fsck"),
    ("help", "Usage: help"),
    ("quit", "Usage: quit"),
];

fn usage(verb: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(name, _)| *name == verb)
        .map(|(_, usage)| *usage)
}

/// One input line, split on blanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Format,
    Create(&'a str),
    Cat(&'a str),
    Ls(Option<&'a str>),
    Cp(&'a str, &'a str),
    Mv(&'a str, &'a str),
    Rm(&'a str),
    Append(&'a str, &'a str),
    Mkdir(&'a str),
    Cd(&'a str),
    Pwd,
    Chmod(&'a str, &'a str),
    Stat(&'a str),
    Df,
    Fsck,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// Known verb, wrong number of arguments.
    Usage(&'static str),
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Result<Self, ParseError<'a>> {
        let args: Vec<&'a str> = line.split_whitespace().collect();
        let cmd = match *args.as_slice() {
            [] => Command::Empty,
            ["format"] => Command::Format,
            ["create", path] => Command::Create(path),
            ["cat", path] => Command::Cat(path),
            ["ls"] => Command::Ls(None),
            ["ls", path] => Command::Ls(Some(path)),
            ["cp", src, dst] => Command::Cp(src, dst),
            ["mv", src, dst] => Command::Mv(src, dst),
            ["rm", path] => Command::Rm(path),
            ["append", src, dst] => Command::Append(src, dst),
            ["mkdir", path] => Command::Mkdir(path),
            ["cd", path] => Command::Cd(path),
            ["pwd"] => Command::Pwd,
            ["chmod", mode, path] => Command::Chmod(mode, path),
            ["stat", path] => Command::Stat(path),
            ["df"] => Command::Df,
            ["fsck"] => Command::Fsck,
            ["help"] => Command::Help,
            ["quit"] => Command::Quit,
            [verb, ..] => {
                return Err(usage(verb).map_or(ParseError::Unknown(verb), ParseError::Usage));
            }
        };
        Ok(cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Why a command stopped: the volume refused it, or the terminal broke.
enum Failure {
    Fs(FsError),
    Io(io::Error),
}

impl From<FsError> for Failure {
    fn from(e: FsError) -> Self {
        Failure::Fs(e)
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Failure::Io(e)
    }
}

/// Line-oriented interpreter driving a [`SimFs`].
///
/// Reads commands from `input` and writes every answer to `out`. A failing
/// command prints an error line and the session goes on; only a broken
/// `input` or `out` ends [`Shell::run`] early.
pub struct Shell<IO: BlockIO, R: BufRead, W: Write> {
    fs: SimFs<IO>,
    input: R,
    out: W,
    prompt: String,
    color: bool,
    echo: bool,
}

impl<IO: BlockIO, R: BufRead, W: Write> Shell<IO, R, W> {
    pub fn new(fs: SimFs<IO>, input: R, out: W, config: &ShellConfig) -> Self {
        Self {
            fs,
            input,
            out,
            prompt: config.prompt.clone(),
            color: config.color,
            echo: false,
        }
    }

    /// Repeats every line read after the prompt, for non-interactive input.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn into_inner(self) -> (SimFs<IO>, W) {
        (self.fs, self.out)
    }

    /// Reads one raw line without its terminator, `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if self.echo {
            self.out.write_all(&line)?;
            writeln!(self.out)?;
        }
        Ok(Some(line))
    }

    /// Runs until `quit` or the end of the input.
    ///
    /// Command lines are decoded lossily, so stray bytes only make that one
    /// command fail.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            write!(self.out, "{}", self.prompt)?;
            self.out.flush()?;

            let Some(line) = self.next_line()? else {
                if !self.prompt.is_empty() {
                    writeln!(self.out)?;
                }
                return Ok(());
            };
            let text = String::from_utf8_lossy(&line);
            if self.execute(&text)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Parses and runs one line.
    pub fn execute(&mut self, line: &str) -> io::Result<Flow> {
        let cmd = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(ParseError::Usage(usage)) => {
                writeln!(self.out, "{usage}")?;
                return Ok(Flow::Continue);
            }
            Err(ParseError::Unknown(_)) => {
                self.help()?;
                return Ok(Flow::Continue);
            }
        };
        log_verbose!("{cmd:?}");

        match self.dispatch(cmd) {
            Ok(flow) => Ok(flow),
            Err(Failure::Fs(e)) => {
                self.report(line, &e)?;
                Ok(Flow::Continue)
            }
            Err(Failure::Io(e)) => Err(e),
        }
    }

    fn dispatch(&mut self, cmd: Command<'_>) -> Result<Flow, Failure> {
        match cmd {
            Command::Empty => {}
            Command::Format => self.fs.format()?,
            Command::Create(path) => {
                writeln!(self.out, "Enter data. Empty line to end.")?;
                let data = self.read_content()?;
                self.fs.create(path, &data)?;
            }
            Command::Cat(path) => {
                let data = self.fs.cat(path)?;
                self.out.write_all(&data)?;
                if !data.is_empty() && !data.ends_with(b"\n") {
                    writeln!(self.out)?;
                }
            }
            Command::Ls(path) => {
                let entries = match path {
                    Some(path) => self.fs.list(path)?,
                    None => self.fs.ls()?,
                };
                self.print_listing(&entries)?;
            }
            Command::Cp(src, dst) => self.fs.cp(src, dst)?,
            Command::Mv(src, dst) => self.fs.mv(src, dst)?,
            Command::Rm(path) => self.fs.rm(path)?,
            Command::Append(src, dst) => self.fs.append(src, dst)?,
            Command::Mkdir(path) => self.fs.mkdir(path)?,
            Command::Cd(path) => self.fs.cd(path)?,
            Command::Pwd => {
                let path = self.fs.pwd()?;
                writeln!(self.out, "{path}")?;
            }
            Command::Chmod(mode, path) => self.fs.chmod(mode, path)?,
            Command::Stat(path) => {
                let entry = self.fs.stat(path)?;
                writeln!(self.out, "name: {}", entry.name)?;
                writeln!(self.out, "type: {}", entry.kind.label())?;
                writeln!(self.out, "accessrights: {}", entry.rights)?;
                writeln!(self.out, "size: {}", entry.size)?;
                writeln!(self.out, "first block: {}", entry.first_block)?;
            }
            Command::Df => {
                let usage = self.fs.df();
                writeln!(self.out, "block size: {}", usage.block_size)?;
                writeln!(
                    self.out,
                    "blocks: {} total, {} used, {} free",
                    usage.total, usage.used, usage.free
                )?;
            }
            Command::Fsck => {
                let report = self.fs.check()?;
                write!(self.out, "{}", report.problems())?;
                if report.ok() {
                    writeln!(self.out, "fsck: volume is clean")?;
                }
            }
            Command::Help => self.help()?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Content lines up to the first empty one, each kept byte for byte
    /// with its `\n`.
    fn read_content(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.is_empty() {
                break;
            }
            data.extend_from_slice(&line);
            data.push(b'\n');
        }
        Ok(data)
    }

    fn print_listing(&mut self, entries: &[DirEntry]) -> io::Result<()> {
        writeln!(self.out, "name\t type\t accessrights\t size")?;
        for entry in entries {
            let size = if entry.is_dir() {
                String::from("-")
            } else {
                entry.size.to_string()
            };
            writeln!(
                self.out,
                "{}\t {}\t {}\t {}",
                entry.name,
                entry.kind.label(),
                entry.rights,
                size
            )?;
        }
        Ok(())
    }

    fn help(&mut self) -> io::Result<()> {
        let verbs: Vec<&str> = COMMANDS.iter().map(|(name, _)| *name).collect();
        writeln!(self.out, "Available commands:")?;
        writeln!(self.out, "{}", verbs.join(", "))
    }

    fn report(&mut self, line: &str, err: &FsError) -> io::Result<()> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let label = if self.color {
            "Error:".red().bold().to_string()
        } else {
            String::from("Error:")
        };
        writeln!(self.out, "{label} {} failed: {err}", args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn shell(script: &str) -> Shell<MemBlockIO, Cursor<Vec<u8>>, Vec<u8>> {
        let fs = SimFs::format_new(MemBlockIO::new(512, 64)).unwrap();
        let config = ShellConfig {
            prompt: String::new(),
            color: false,
        };
        Shell::new(fs, Cursor::new(script.as_bytes().to_vec()), Vec::new(), &config)
    }

    fn run(script: &str) -> String {
        let mut sh = shell(script);
        sh.run().unwrap();
        String::from_utf8(sh.into_inner().1).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse(""), Ok(Command::Empty));
        assert_eq!(Command::parse("   "), Ok(Command::Empty));
        assert_eq!(Command::parse("  cp   a  b "), Ok(Command::Cp("a", "b")));
        assert_eq!(Command::parse("ls"), Ok(Command::Ls(None)));
        assert_eq!(Command::parse("ls d1"), Ok(Command::Ls(Some("d1"))));
        assert_eq!(Command::parse("chmod 6 f"), Ok(Command::Chmod("6", "f")));
        assert_eq!(
            Command::parse("rm"),
            Err(ParseError::Usage("Usage: rm <path>"))
        );
        assert_eq!(
            Command::parse("pwd now"),
            Err(ParseError::Usage("Usage: pwd"))
        );
        assert_eq!(Command::parse("frob x"), Err(ParseError::Unknown("frob")));
    }

    #[test]
    fn test_create_then_cat() {
        let out = run("create f1\nhej heja hejare\n\ncat f1\n");
        assert_eq!(out, "Enter data. Empty line to end.\nhej heja hejare\n");
    }

    #[test]
    fn test_create_multiple_lines() {
        let mut sh = shell("create f\nline one\nline two\n\n");
        sh.run().unwrap();
        let (mut fs, _) = sh.into_inner();
        assert_eq!(fs.cat("f").unwrap(), b"line one\nline two\n");
        assert_eq!(fs.stat("f").unwrap().size, 18);
    }

    #[test]
    fn test_ls_listing() {
        let out = run("mkdir d1\ncreate f1\nhej heja hejare\n\nls\n");
        assert!(out.ends_with(
            "name\t type\t accessrights\t size\nd1\t dir\t rwx\t -\nf1\t file\t rw-\t 16\n"
        ));
    }

    #[test]
    fn test_usage_lines() {
        let out = run("cp a\nmv\nls a b\n");
        assert_eq!(
            out,
            "Usage: cp <sourcepath> <destpath>\n\
             Usage: mv <sourcepath> <destpath>\n\
             Usage: ls [dirpath]\n"
        );
    }

    #[test]
    fn test_errors_keep_session_alive() {
        let out = run("cat nope\nmkdir d1\nmkdir d1\npwd\n");
        assert_eq!(
            out,
            "Error: cat nope failed: No such file or directory\n\
             Error: mkdir d1 failed: File exists\n\
             /\n"
        );
    }

    #[test]
    fn test_unknown_verb_prints_help() {
        let out = run("frobnicate\n");
        assert!(out.starts_with("Available commands:\n"));
        assert!(out.contains("format, create, cat, ls, cp, mv, rm, append, mkdir, cd, pwd, chmod"));
    }

    #[test]
    fn test_quit_stops_reading() {
        let mut sh = shell("mkdir a\nquit\nmkdir b\n");
        sh.run().unwrap();
        let (mut fs, _) = sh.into_inner();
        let names: Vec<String> = fs.ls().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_navigation_and_permissions() {
        let out = run(
            "mkdir d1\ncd d1\ncreate f\nx\n\npwd\nchmod 2 f\ncat f\nchmod 9 f\ncd ..\npwd\n",
        );
        assert_eq!(
            out,
            "Enter data. Empty line to end.\n\
             /d1\n\
             Error: cat f failed: Permission denied\n\
             Error: chmod 9 f failed: Invalid access mode\n\
             /\n"
        );
    }

    #[test]
    fn test_stat_df_fsck() {
        let out = run("create f\nabc\n\nstat f\ndf\nfsck\n");
        assert!(out.contains("name: f\ntype: file\naccessrights: rw-\nsize: 4\n"));
        assert!(out.contains("block size: 512\nblocks: 64 total, 3 used, 61 free\n"));
        assert!(out.contains("fsck: volume is clean\n"));
    }

    #[test]
    fn test_binary_content_keeps_session_alive() {
        let mut sh = shell("");
        sh.input = Cursor::new(b"create f\n\xff\xfe\n\nmkdir after\n\xc3(\nls\n".to_vec());
        sh.run().unwrap();
        let (mut fs, out) = sh.into_inner();
        assert_eq!(fs.cat("f").unwrap(), b"\xff\xfe\n");
        assert!(fs.stat("after").unwrap().is_dir());
        let out = String::from_utf8_lossy(&out);
        assert!(out.contains("Available commands:"));
        assert!(out.contains("after\t dir\t rwx\t -\n"));
    }

    #[test]
    fn test_echo_and_prompt() {
        let fs = SimFs::format_new(MemBlockIO::new(512, 64)).unwrap();
        let config = ShellConfig {
            prompt: String::from("filesystem> "),
            color: false,
        };
        let mut sh = Shell::new(fs, Cursor::new(b"pwd\n".to_vec()), Vec::new(), &config)
            .with_echo(true);
        sh.run().unwrap();
        let out = String::from_utf8(sh.into_inner().1).unwrap();
        assert_eq!(out, "filesystem> pwd\n/\nfilesystem> \n");
    }
}
