// Service exports
pub mod cache;
pub mod directory;
pub mod matching;
pub mod registry;

pub use cache::{CacheKey, CachedRegistry};
pub use directory::{DirectoryError, DirectorySource, EducationDirectoryClient, SchoolQuery, StaticDirectory};
pub use matching::{MatchingService, SearchSettings};
pub use registry::{CompanyRegistryClient, FallbackRegistry, RegistryError, RegistrySource, StaticRegistry};
