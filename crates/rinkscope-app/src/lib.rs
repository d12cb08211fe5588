// Library root: analysis orchestration, the SVG rendering adapter and the
// report writers, shared by the `rinkscope` binary and integration tests.

pub mod pipeline;
pub mod plot;
pub mod report;
