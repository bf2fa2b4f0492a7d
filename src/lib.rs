//! Vector search for OpenRegister objects and files.
//!
//! Register objects and uploaded files are turned into text, embedded by an
//! external provider (OpenAI, Fireworks or Ollama) and stored in one of three
//! vector backends. Stored vectors serve semantic search and hybrid
//! (keyword + vector) search.
//!
//! # Architecture
//!
//! - **Strategies**: one [`vectorization::strategy::VectorizationStrategy`]
//!   per entity type decides what to fetch, how to split it into text items
//!   and what metadata to store with each vector
//! - **Orchestrator**: [`vectorization::VectorizationService`] runs a batch
//!   for one entity type, serially or in grouped embedding calls, and never
//!   lets one failing item or entity stop the rest
//! - **Facade**: [`vectors::VectorEmbeddings`] resolves providers and
//!   backends from settings and exposes embedding, storage, search and
//!   diagnostics
//! - **Storage**: SQLite (objects, files, FTS5 keyword index, vectors) with
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for in-database
//!   cosine distance, or an external Solr collection
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`embedding`]: Embedding generators and provider resolution
//! - [`error`]: The [`VectorError`] taxonomy
//! - [`register`]: Object, view and file storage plus keyword search
//! - [`vectorization`]: Strategies and the batch orchestrator
//! - [`vectors`]: Embedding/storage/search facade and vector backends

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod register;
pub mod vectorization;
pub mod vectors;

pub use error::VectorError;
