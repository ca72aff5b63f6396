fn main() {
    println!("cargo:rerun-if-changed=proto/record.proto");
    prost_build::compile_protos(&["proto/record.proto"], &["proto/"])
        .expect("failed to compile record.proto");
}
