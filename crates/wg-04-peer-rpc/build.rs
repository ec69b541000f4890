fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use standard OUT_DIR for generated proto code
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/plant_peer.proto"], &["proto"])?;
    Ok(())
}
