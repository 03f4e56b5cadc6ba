// src/lib.rs

#![doc(html_root_url = "https://docs.rs/veranda/0.1.0")]
#![doc = r#"
# Veranda

Veranda is a small website starter server: static file serving with sensible
cache headers, a WebSocket relay for live collaboration, and a JSON
configuration save endpoint.

## Modules

- [`config`]: Configuration loading and merging from CLI, file, and environment.
- [`relay`]: The collaboration relay peer registry and WebSocket endpoint.
- [`store`]: Site configuration persistence.
- [`web`]: The site server: static files and the save endpoint.
- [`compat`]: Backward-compatibility shim for renamed custom elements.

See the README for usage examples and more details.
"#]

pub mod compat;
pub mod config;
pub mod relay;
pub mod store;
pub mod web;
