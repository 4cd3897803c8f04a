// Static FFmpeg (vcpkg) needs the capture-side system libraries on Windows MSVC
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // DirectShow camera input (dshow)
        println!("cargo:rustc-link-lib=dylib=strmiids");
        println!("cargo:rustc-link-lib=dylib=ole32");
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Media Foundation helpers pulled in by libavdevice
        println!("cargo:rustc-link-lib=dylib=mfplat");
        println!("cargo:rustc-link-lib=dylib=mfuuid");

        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
