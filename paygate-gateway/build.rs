fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        // Wire messages double as the gateway's JSON bodies.
        .type_attribute(
            ".paygate",
            "#[derive(serde::Serialize, serde::Deserialize)] #[serde(default)]",
        )
        .compile(
            &["../paygate-common/proto/paygate.proto"],
            &["../paygate-common/proto"],
        )?;
    Ok(())
}
