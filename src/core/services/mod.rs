pub mod batch_coordinator;
pub mod directory_provisioner;
pub mod encryption_engine;
pub mod file_discoverer;
pub mod key_ring_loader;
pub mod path_mapper;
