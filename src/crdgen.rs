//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML for every kind
//! this operator manages.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/nimbus-crds.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;

use nimbus_cloud_operator::crd::{Database, Stream};

fn main() {
    let crds = [Database::crd(), Stream::crd()];

    for crd in crds {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{}", yaml);
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {}", e);
                std::process::exit(1);
            }
        }
    }
}
