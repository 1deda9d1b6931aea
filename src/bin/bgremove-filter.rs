//! Background segmentation filter CLI
//!
//! Applies the per-frame filter to a still image using the ONNX Runtime or Tract backend.

use bgremove_filter::cli;

fn main() -> anyhow::Result<()> {
    cli::main()
}
