//! Prints the Rancher CRDs consumed by the import controller.
//!
//! Used to seed test clusters that do not run Rancher:
//! `cargo run -p crds --bin crdgen | kubectl apply -f -`

use crds::{ClusterRegistrationToken, RancherCluster};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in [RancherCluster::crd(), ClusterRegistrationToken::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
