use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

pub const PACK_EXTENSION: &str = ".mrpack";

/// Checks that `path` names an existing `.mrpack` file.
pub fn validate_pack_path(path: &Path) -> anyhow::Result<PathBuf> {
    let is_mrpack = path
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(PACK_EXTENSION))
        .unwrap_or(false);

    if !is_mrpack || !path.is_file() {
        bail!("The provided path is invalid or does not point to a .mrpack file.");
    }

    Ok(path.to_path_buf())
}

/// Uses the command-line argument if there is one, otherwise asks on the terminal.
pub fn resolve_pack_path(arg: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return validate_pack_path(&path);
    }

    if !io::stdin().is_terminal() {
        bail!("No .mrpack path given and stdin is not a terminal to ask for one.");
    }

    let stdin = io::stdin();
    prompt_pack_path(&mut stdin.lock(), &mut io::stderr())
}

/// Keeps asking until a valid path is entered. Running out of input is an error.
pub fn prompt_pack_path<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<PathBuf> {
    loop {
        write!(output, "Please provide the path to the .mrpack file: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("No .mrpack path was entered.");
        }

        let entered = clean_input(&line);
        if !entered.is_empty() {
            if let Ok(path) = validate_pack_path(Path::new(entered)) {
                return Ok(path);
            }
        }

        writeln!(output, "Invalid path. Please try again.")?;
    }
}

/// Strips whitespace and the quotes terminals add around dragged-in paths.
fn clean_input(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .or_else(|| line.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')))
        .unwrap_or(line)
}
