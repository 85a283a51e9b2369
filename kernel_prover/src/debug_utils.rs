use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Serializes kernel inputs to pretty-printed JSON and saves them to
/// `debug_dir/file_name`, creating the folder if needed.
pub fn save_inputs_to_disk<T: Serialize>(
    debug_dir: &Path,
    file_name: String,
    inputs: T,
) -> anyhow::Result<()> {
    fs::create_dir_all(debug_dir)
        .with_context(|| format!("creating debug folder {}", debug_dir.display()))?;

    let input_file_path = debug_dir.join(file_name);
    let mut file = File::create(&input_file_path)
        .with_context(|| format!("creating {}", input_file_path.display()))?;

    let all_inputs_str = serde_json::to_string_pretty(&inputs)?;
    file.write_all(all_inputs_str.as_bytes())?;

    Ok(())
}
