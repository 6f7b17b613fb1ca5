//! rancher-turtles resource definitions
//!
//! Typed views of the external resources the import controller reads and
//! writes. None of these CRDs are owned by this project:
//! - `CapiCluster`: Cluster API `cluster.x-k8s.io/v1beta1` `Cluster`
//! - `RancherCluster`: Rancher `provisioning.cattle.io/v1` `Cluster`
//! - `ClusterRegistrationToken`: Rancher `management.cattle.io/v3` `ClusterRegistrationToken`
//!
//! Only the fields the controller relies on are modelled. Unknown fields are
//! dropped on read, so writes must go through merge patches built from a
//! before/after pair of the same typed object.

pub mod capi_cluster;
pub mod rancher_cluster;
pub mod registration_token;

pub use capi_cluster::*;
pub use rancher_cluster::*;
pub use registration_token::*;
