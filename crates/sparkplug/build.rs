fn main() {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
    }
    prost_build::compile_protos(&["proto/sparkplug_b.proto"], &["proto/"])
        .expect("failed to compile sparkplug_b.proto");
}
