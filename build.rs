use std::env;
use std::path::{Path, PathBuf};

const WATCHED: [&str; 4] = ["FFMPEG_DIR", "PKG_CONFIG_PATH", "VCPKG_ROOT", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

fn vcpkg_install(root: &Path) -> PathBuf {
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    root.join("installed").join(triplet)
}

fn main() {
    for variable in WATCHED {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Unix builds find FFmpeg through pkg-config inside ffmpeg-sys-next.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Some(root) = env::var_os("VCPKG_ROOT").map(PathBuf::from) else {
        warn("secondsight needs FFmpeg: set FFMPEG_DIR, or VCPKG_ROOT after `vcpkg install ffmpeg`.");
        return;
    };

    let install = vcpkg_install(&root);
    if install.is_dir() {
        warn(format!(
            "Using FFmpeg from vcpkg at {0}; export FFMPEG_DIR={0} to silence this warning.",
            install.display()
        ));
    } else {
        warn(format!(
            "VCPKG_ROOT points at {} but FFmpeg is not installed there.",
            install.display()
        ));
    }
}
