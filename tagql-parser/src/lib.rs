//! # tagql-parser
//!
//! Front-end of the tagql compiler: finds GraphQL literals embedded in
//! application sources, validates and parses them, and loads the schema they
//! are compiled against.
//!
//! File Layout
//!
//! src/tagql
//!   ├── filter        Cheap "is this file worth reading" predicate
//!   ├── extract       Lexical scan for graphql`...` tagged templates
//!   ├── transforms    Composable text transforms applied before extraction
//!   ├── parsing       Tag validation and GraphQL parsing into documents
//!   ├── schema        SDL / introspection loading and normalization
//!   ├── watch         Watchman-style file matching expressions
//!   ├── pipeline      Preconditions and parser/writer configuration
//!   └── runner        Local orchestrator used by the command line tool
//!
//! The orchestrator in `runner` is deliberately small. Hosts with their own
//! build system only need `pipeline::Driver` and an `Orchestrator` of their own.

pub mod tagql;
