//! Build script to ensure the Python extension module links correctly on macOS.

fn main() {
    let python_feature = std::env::var_os("CARGO_FEATURE_PYTHON").is_some();
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    if python_feature && target_os == "macos" {
        // Python symbols are resolved by the interpreter at import time.
        println!("cargo:rustc-link-arg=-Wl,-undefined,dynamic_lookup");
    }
}
