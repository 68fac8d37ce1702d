//! Parameter persistence as `address = value` lines.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use super::registry::ParamHost;
use crate::error::Result;

/// Default config file location
pub const CONFIG_FILE: &str = "./config.txt";

/// Write every registered parameter, one `address = value` line each
pub fn write_config<W: Write>(host: &ParamHost, w: &mut W) -> Result<()> {
    for param in host.iter() {
        writeln!(w, "{} = {}", param.address, param.value)?;
    }
    Ok(())
}

/// Read `(address, value)` pairs; lines without ` = ` are skipped
pub fn read_config<R: BufRead>(reader: R) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some((address, value)) = line.split_once(" = ") {
            entries.push((address.trim().to_string(), value.trim().to_string()));
        }
    }
    Ok(entries)
}

pub fn save(host: &ParamHost, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    write_config(host, &mut w)?;
    w.flush()?;
    info!("Saved configuration to {}", path.display());
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let entries = read_config(BufReader::new(File::open(path)?))?;
    info!("Read {} settings from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{register_defaults, CAM_POS, RENDER_MODE};
    use glam::Vec3;
    use std::io::Cursor;

    #[test]
    fn test_config_round_trip() {
        let mut host = ParamHost::new();
        register_defaults(&mut host);
        host.set_from_str(CAM_POS, "1,2,3").unwrap();
        host.set_from_str(RENDER_MODE, "POINTS").unwrap();

        let mut out = Vec::new();
        write_config(&host, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("/cam/pos = 1,2,3\n"));
        assert!(text.contains("/render/mode = POINTS\n"));

        let mut restored = ParamHost::new();
        register_defaults(&mut restored);
        for (address, value) in read_config(Cursor::new(text)).unwrap() {
            restored.set_from_str(&address, &value).unwrap();
        }
        assert_eq!(restored.vec3(CAM_POS), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(restored.choice(RENDER_MODE), Some("POINTS"));
    }

    #[test]
    fn test_read_skips_junk_lines() {
        let text = "# comment\n/render/split = true\n\nnot a setting\n";
        let entries = read_config(Cursor::new(text)).unwrap();
        assert_eq!(entries, vec![("/render/split".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        let mut host = ParamHost::new();
        register_defaults(&mut host);

        save(&host, &path).unwrap();
        let entries = load(&path).unwrap();
        assert_eq!(entries.len(), host.iter().count());
    }
}
