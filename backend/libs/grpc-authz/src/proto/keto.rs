//! `ory.keto.acl.v1alpha1` check messages and client
//!
//! Keto models a check as namespace/object/relation/subject rather than
//! resource/permission/subject.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubjectSet {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub object: String,
    #[prost(string, tag = "3")]
    pub relation: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Subject {
    #[prost(oneof = "subject::Ref", tags = "1, 2")]
    pub r#ref: Option<subject::Ref>,
}

pub mod subject {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Ref {
        #[prost(string, tag = "1")]
        Id(String),
        #[prost(message, tag = "2")]
        Set(super::SubjectSet),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub object: String,
    #[prost(string, tag = "3")]
    pub relation: String,
    #[prost(message, optional, tag = "4")]
    pub subject: Option<Subject>,
    #[prost(bool, tag = "5")]
    pub latest: bool,
    #[prost(string, tag = "6")]
    pub snaptoken: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckResponse {
    #[prost(bool, tag = "1")]
    pub allowed: bool,
    #[prost(string, tag = "2")]
    pub snaptoken: String,
}

tonic::include_proto!("ory.keto.acl.v1alpha1.CheckService");
