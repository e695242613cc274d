use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load a tag memory image.
///
/// `.hex` and `.txt` files hold hex text (whitespace and `#` comments are
/// ignored, so reader-tool page dumps paste in as is); anything else is raw
/// binary.
pub fn load(path: &Path) -> Result<Vec<u8>> {
    let is_text = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("hex" | "txt")
    );
    if is_text {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("reading dump {}", path.display()))?;
        parse_hex(&txt).with_context(|| format!("decoding hex dump {}", path.display()))
    } else {
        fs::read(path).with_context(|| format!("reading dump {}", path.display()))
    }
}

pub fn parse_hex(txt: &str) -> Result<Vec<u8>> {
    let digits: String = txt
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .collect();
    Ok(hex::decode(digits)?)
}
