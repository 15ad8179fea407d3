//! rulepatch: apply ordered pattern/replacement rules to text files

use anyhow::Result;

fn main() -> Result<()> {
    rulepatch::cli::run()
}
