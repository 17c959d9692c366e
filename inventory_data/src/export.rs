//! Delimited output shared by every tabular result

use crate::error::Result;
use std::fs;
use std::path::Path;

/// Render a float for output; missing values become an empty field
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Write a header and records as CSV, creating parent directories as needed
pub fn write_table<P, I>(path: P, headers: &[String], rows: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Vec<String>>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_table_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let headers = vec!["a".to_string(), "b".to_string()];
        write_table(&path, &headers, vec![vec![format_value(1.5), format_value(f64::NAN)]])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a,b\n1.5,\n");
    }
}
