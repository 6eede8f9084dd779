//! Print the catalog CRDs as a multi-document YAML stream.
//!
//! `cargo run -p crds --bin crdgen > config/crds.yaml`

use std::process::ExitCode;

fn main() -> ExitCode {
    for descriptor in crds::schema_descriptors() {
        match serde_yaml::to_string(&descriptor.definition()) {
            Ok(yaml) => print!("---\n{yaml}"),
            Err(e) => {
                eprintln!("failed to render {}: {e}", descriptor.qualified_name());
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
