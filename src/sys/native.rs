use std::{
    any::Any,
    io::{stdin, stdout, BufRead, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::SysBackend;

/// The default native system backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSys;

impl SysBackend for NativeSys {
    fn any(&self) -> &dyn Any {
        self
    }
    fn print_str_stdout(&self, s: &str) -> Result<(), String> {
        let mut stdout = stdout().lock();
        stdout.write_all(s.as_bytes()).map_err(|e| e.to_string())?;
        stdout.flush().map_err(|e| e.to_string())
    }
    fn scan_line_stdin(&self) -> Result<Option<String>, String> {
        let mut line = String::new();
        let read = stdin().lock().read_line(&mut line).map_err(|e| e.to_string())?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}
