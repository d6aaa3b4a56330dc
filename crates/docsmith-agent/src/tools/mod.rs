// ABOUTME: Tool implementations the loops can be equipped with.
// ABOUTME: Retrieval tools serve expert loops; fs tools serve the supervisor.

pub mod fs;
pub mod retrieval;

pub use fs::{FindFileTool, ProjectStructureTool, ReadFileTool};
pub use retrieval::{GetPageTool, ListPagesTool, RetrieveDocsTool};
