use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

mod table;

pub use table::{CategoryRow, NoticeRow, TableRow, render_fields, render_table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
    Quiet,
}

#[derive(Clone, Debug)]
pub struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, path: Option<PathBuf>) -> Self {
        Self { format, path }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }

        let data = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };

        self.write(&data)
    }

    pub fn emit_table<T: TableRow + Serialize + Sized>(&self, items: &[T]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                let data = render_table(items);
                self.write(&data)
            }
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(items),
        }
    }

    /// A single record: `text` in table mode, `value` as json otherwise.
    pub fn emit_record<T: Serialize + ?Sized>(&self, value: &T, text: &str) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.write(text),
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(value),
        }
    }

    fn write(&self, data: &str) -> Result<()> {
        let mut output = data.to_string();
        if !output.ends_with('\n') {
            output.push('\n');
        }

        if let Some(path) = &self.path {
            fs::write(path, output).with_context(|| format!("write {}", path.display()))?;
        } else {
            print!("{output}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
    }

    impl TableRow for Row {
        fn headers() -> &'static [&'static str] {
            &["name"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.to_string()]
        }
    }

    #[test]
    fn table_and_json_to_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.txt");
        let rows = [Row { name: "Academic" }, Row { name: "Events" }];

        Output::new(OutputFormat::Table, Some(path.clone())).emit_table(&rows)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "name\n--------\nAcademic\nEvents\n"
        );

        Output::new(OutputFormat::Json, Some(path.clone())).emit_table(&rows)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "[{\"name\":\"Academic\"},{\"name\":\"Events\"}]\n"
        );
        Ok(())
    }

    #[test]
    fn quiet_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.txt");
        let out = Output::new(OutputFormat::Quiet, Some(path.clone()));
        out.emit_json(&serde_json::json!({"a": 1}))?;
        out.emit_record(&serde_json::json!({"a": 1}), "a: 1")?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn record_text_in_table_mode() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.txt");
        Output::new(OutputFormat::Table, Some(path.clone()))
            .emit_record(&serde_json::json!({"a": 1}), "a: 1")?;
        assert_eq!(fs::read_to_string(&path)?, "a: 1\n");
        Ok(())
    }
}
