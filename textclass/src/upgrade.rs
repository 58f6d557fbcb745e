/*! Conversion of layout files written for older layout formats.

The reader only understands [`LAYOUT_FORMAT`](crate::LAYOUT_FORMAT); when a file declares a
different `Format`, the reader hands it to the [`LayoutUpgrader`] of its
[`ReadContext`](crate::textclass::ReadContext) and reads the result instead.
*/

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use log::{debug, warn};
use crate::paths::SearchPaths;

/// Rewrites old-format layout text to the current format.
pub trait LayoutUpgrader {
    /// The converted text, or `None` if conversion failed.
    fn upgrade(&self,text:&str) -> Option<String>;
    /// Converts the contents of `file`.
    fn upgrade_file(&self,file:&Path) -> Option<String> {
        match std::fs::read(file) {
            Ok(bytes) => self.upgrade(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!(target:"tclass","Cannot read {} for conversion: {}",file.display(),e);
                None
            }
        }
    }
}

/// Runs an external converter that reads old-format text on stdin and writes the converted
/// text to stdout, like `python3 layout2layout.py`.
#[derive(Clone,Debug)]
pub struct ScriptUpgrader {
    program:PathBuf,
    args:Vec<String>
}

impl ScriptUpgrader {
    pub fn new<P:Into<PathBuf>>(program:P,args:Vec<String>) -> Self {
        ScriptUpgrader { program:program.into(), args }
    }
    /// `python3 <root>/scripts/layout2layout.py`, for the first root that has the script.
    pub fn layout2layout(paths:&SearchPaths) -> Option<Self> {
        let script = paths.lib_file_search("scripts","layout2layout.py","")?;
        Some(ScriptUpgrader::new("python3",vec![script.display().to_string()]))
    }
}

impl LayoutUpgrader for ScriptUpgrader {
    fn upgrade(&self,text:&str) -> Option<String> {
        debug!(target:"tclass","Running {} {:?}",self.program.display(),self.args);
        let mut child = Command::new(&self.program).args(&self.args)
            .stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit())
            .spawn().map_err(|e| warn!(target:"tclass","Cannot run {}: {}",self.program.display(),e)).ok()?;
        let mut stdin = child.stdin.take()?;
        let input = text.to_string();
        // feed stdin from another thread so a full stdout pipe cannot block us
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));
        let mut out = String::new();
        let read = child.stdout.take().map(|mut s| s.read_to_string(&mut out));
        let status = child.wait().ok()?;
        let written = writer.join().map(|r| r.is_ok()).unwrap_or(false);
        if !status.success() || !written || !matches!(read,Some(Ok(_))) {
            warn!(target:"tclass","{} failed ({})",self.program.display(),status);
            return None
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn external_converter() {
        let up = ScriptUpgrader::new("sed",vec!["s/^Format 59$/Format 60/".to_string()]);
        assert_eq!(up.upgrade("Format 59\nStyle Standard\nEnd\n").as_deref(),Some("Format 60\nStyle Standard\nEnd\n"));
        let broken = ScriptUpgrader::new("/surely/not/a/program",vec![]);
        assert!(broken.upgrade("Format 59\n").is_none());
    }

    #[test]
    fn no_script_no_upgrader() {
        assert!(ScriptUpgrader::layout2layout(&SearchPaths::default()).is_none());
    }
}
