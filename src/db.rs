pub mod store;
pub use store::{ContactStore, FolderStore, PackageStore, PostStore};
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod folder_repo;
pub use folder_repo::FolderRepository;
pub mod contact_repo;
pub use contact_repo::ContactRepository;
pub mod package_repo;
pub use package_repo::PackageRepository;
pub mod post_repo;
pub use post_repo::PostRepository;
