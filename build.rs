//! Retrieves information about the version of the benchmark suite from Git and
//! the build environment. This information is written to the output directory
//! and can be accessed at runtime through the `build` module.

fn main() -> shadow_rs::SdResult<()> {
    shadow_rs::new()
}
