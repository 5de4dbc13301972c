// Module layout (Clean Architecture style)
// - bootstrap: configuration and the shared application context
// - infrastructure: Postgres repositories and notification adapters
// - presentation: HTTP handlers, auth extraction and routing
// - application: use cases, ports, access policy and validation
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
