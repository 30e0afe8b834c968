use tonic_build::manual::{Builder, Method, Service};

fn main() {
    // Clients for the single check RPC of each supported permission service.
    // Messages live in src/proto/ as prost structs, so no protoc is needed.

    let spicedb = Service::builder()
        .name("PermissionsService")
        .package("authzed.api.v1")
        .method(
            Method::builder()
                .name("check_permission")
                .route_name("CheckPermission")
                .input_type("crate::proto::authzed::CheckPermissionRequest")
                .output_type("crate::proto::authzed::CheckPermissionResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    let keto = Service::builder()
        .name("CheckService")
        .package("ory.keto.acl.v1alpha1")
        .method(
            Method::builder()
                .name("check")
                .route_name("Check")
                .input_type("crate::proto::keto::CheckRequest")
                .output_type("crate::proto::keto::CheckResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    Builder::new()
        .build_server(false) // This is a client library, not a server
        .build_client(true)
        .compile(&[spicedb, keto]);

    println!("cargo:rerun-if-changed=build.rs");
}
