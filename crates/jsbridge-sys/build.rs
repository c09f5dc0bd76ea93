use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=BUN_WEBKIT_VERSION");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap();

    if cfg!(feature = "bun-webkit") {
        bun_webkit::configure(&target_os);
        return;
    }

    match target_os.as_str() {
        "macos" | "ios" => configure_apple(),
        "linux" => configure_linux(),
        _ => panic!(
            "Unsupported OS for system JavaScriptCore: {} (enable the `bun-webkit` feature)",
            target_os
        ),
    }
}

fn configure_apple() {
    println!("cargo:rustc-link-lib=framework=JavaScriptCore");

    if let Ok(sdk_path) = std::process::Command::new("xcrun")
        .args(["--show-sdk-path"])
        .output()
    {
        let sdk_path = String::from_utf8_lossy(&sdk_path.stdout);
        let sdk_path = sdk_path.trim();
        println!(
            "cargo:rustc-link-search=framework={}/System/Library/Frameworks",
            sdk_path
        );
    }
}

fn configure_linux() {
    let candidates = ["javascriptcoregtk-6.0", "javascriptcoregtk-4.1", "javascriptcoregtk-4.0"];

    for name in candidates {
        if let Ok(lib) = pkg_config::Config::new().atleast_version("2.30").probe(name) {
            for path in lib.include_paths {
                println!("cargo:include={}", path.display());
            }
            return;
        }
    }

    panic!(
        "JavaScriptCore not found on Linux. Install with:\n\
         Ubuntu/Debian: sudo apt-get install libjavascriptcoregtk-4.1-dev\n\
         Fedora: sudo dnf install javascriptcoregtk4.1-devel\n\
         Or enable the `bun-webkit` feature to link a prebuilt static build."
    );
}

#[cfg(feature = "bun-webkit")]
mod bun_webkit {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    // bun-webkit version from oven-sh/WebKit releases
    const BUN_WEBKIT_VERSION: &str = "aaf3f80b1cc701b412f8abfb7c7f413644a229ff";

    pub fn configure(target_os: &str) {
        let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap();

        match target_os {
            "macos" => configure_apple(),
            "linux" => {
                let arch = match target_arch.as_str() {
                    "x86_64" => "amd64",
                    "aarch64" => "arm64",
                    _ => panic!("Unsupported architecture for bun-webkit: {}", target_arch),
                };
                let webkit_path = download("linux", arch);
                link(&webkit_path);
            }
            _ => panic!("Unsupported OS for bun-webkit: {}", target_os),
        }
    }

    fn download(os: &str, arch: &str) -> PathBuf {
        let version =
            env::var("BUN_WEBKIT_VERSION").unwrap_or_else(|_| BUN_WEBKIT_VERSION.to_string());

        let webkit_dir = cache_dir().join(&version).join(format!("{}-{}", os, arch));
        let marker = webkit_dir.join(".downloaded");
        if marker.exists() {
            return webkit_dir;
        }

        let url = format!(
            "https://github.com/oven-sh/WebKit/releases/download/autobuild-{}/bun-webkit-{}-{}.tar.gz",
            version, os, arch
        );
        println!("cargo:warning=Downloading bun-webkit from {}", url);

        fs::create_dir_all(&webkit_dir).expect("Failed to create cache directory");

        // Stream straight into the decoder, the archive is large
        let response = ureq::get(&url)
            .call()
            .unwrap_or_else(|e| panic!("Failed to download bun-webkit: {}. URL: {}", e, url));
        let reader = response.into_body().into_reader();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(reader));
        archive
            .unpack(&webkit_dir)
            .expect("Failed to extract bun-webkit archive");

        fs::write(&marker, "").expect("Failed to create marker file");
        webkit_dir
    }

    fn link(webkit_path: &Path) {
        let lib_dir = find_lib_dir(webkit_path);
        println!("cargo:rustc-link-search=native={}", lib_dir.display());

        println!("cargo:rustc-link-lib=static=JavaScriptCore");
        println!("cargo:rustc-link-lib=static=WTF");
        if lib_exists(&lib_dir, "bmalloc") {
            println!("cargo:rustc-link-lib=static=bmalloc");
        }
        if lib_exists(&lib_dir, "icudata") {
            println!("cargo:rustc-link-lib=static=icudata");
            println!("cargo:rustc-link-lib=static=icui18n");
            println!("cargo:rustc-link-lib=static=icuuc");
        }

        for lib in ["stdc++", "atomic", "dl", "pthread", "m"] {
            println!("cargo:rustc-link-lib={}", lib);
        }

        let include_dir = webkit_path.join("include");
        if include_dir.exists() {
            println!("cargo:include={}", include_dir.display());
        }
    }

    fn find_lib_dir(webkit_path: &Path) -> PathBuf {
        let direct = webkit_path.join("lib");
        if direct.exists() {
            return direct;
        }

        // Archives extract into a versioned subdirectory
        fs::read_dir(webkit_path)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path().join("lib"))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| webkit_path.to_path_buf())
    }

    fn lib_exists(lib_dir: &Path, lib_name: &str) -> bool {
        let prefixed = format!("lib{}", lib_name);
        fs::read_dir(lib_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .any(|name| {
                (name.starts_with(lib_name) || name.starts_with(&prefixed))
                    && (name.ends_with(".a") || name.ends_with(".lib"))
            })
    }

    fn cache_dir() -> PathBuf {
        if let Ok(cargo_home) = env::var("CARGO_HOME") {
            return PathBuf::from(cargo_home).join("cache").join("bun-webkit");
        }
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(".cargo").join("cache").join("bun-webkit");
        }
        PathBuf::from(env::var("OUT_DIR").unwrap()).join("bun-webkit-cache")
    }
}

#[cfg(not(feature = "bun-webkit"))]
mod bun_webkit {
    pub fn configure(_target_os: &str) {
        unreachable!("bun-webkit feature flag seen without the build dependencies")
    }
}
