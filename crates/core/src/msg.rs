//! Protobuf responses of `plasticcredit` transactions, as found in the first
//! entry of a confirmed tx's `TxMsgData.msg_responses`.

use prost::Name;

pub const PACKAGE: &str = "empowerchain.plasticcredit";

macro_rules! plasticcredit_name {
    ($ty:ident) => {
        impl Name for $ty {
            const NAME: &'static str = stringify!($ty);
            const PACKAGE: &'static str = PACKAGE;

            // cosmos type urls carry no host
            fn type_url() -> String {
                format!("/{}", Self::full_name())
            }
        }
    };
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreditAmount {
    #[prost(uint64, tag = "1")]
    pub active: u64,

    #[prost(uint64, tag = "2")]
    pub retired: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreditCollection {
    #[prost(string, tag = "1")]
    pub denom: String,

    #[prost(uint64, tag = "2")]
    pub project_id: u64,

    #[prost(message, optional, tag = "3")]
    pub total_amount: Option<CreditAmount>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreditBalance {
    #[prost(string, tag = "1")]
    pub owner: String,

    #[prost(string, tag = "2")]
    pub denom: String,

    #[prost(message, optional, tag = "3")]
    pub balance: Option<CreditAmount>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgCreateIssuerResponse {
    #[prost(uint64, tag = "1")]
    pub issuer_id: u64,
}
plasticcredit_name!(MsgCreateIssuerResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgUpdateIssuerResponse {}
plasticcredit_name!(MsgUpdateIssuerResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgCreateApplicantResponse {
    #[prost(uint64, tag = "1")]
    pub applicant_id: u64,
}
plasticcredit_name!(MsgCreateApplicantResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgCreateCreditClassResponse {}
plasticcredit_name!(MsgCreateCreditClassResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgCreateProjectResponse {
    #[prost(uint64, tag = "1")]
    pub project_id: u64,
}
plasticcredit_name!(MsgCreateProjectResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgApproveProjectResponse {}
plasticcredit_name!(MsgApproveProjectResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgIssueCreditsResponse {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<CreditCollection>,
}
plasticcredit_name!(MsgIssueCreditsResponse);

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MsgTransferCreditsResponse {}
plasticcredit_name!(MsgTransferCreditsResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgRetireCreditsResponse {
    #[prost(message, optional, tag = "1")]
    pub balance: Option<CreditBalance>,
}
plasticcredit_name!(MsgRetireCreditsResponse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_urls_follow_the_proto_package() {
        assert_eq!(
            MsgCreateIssuerResponse::type_url(),
            "/empowerchain.plasticcredit.MsgCreateIssuerResponse"
        );
        assert_eq!(
            MsgRetireCreditsResponse::full_name(),
            "empowerchain.plasticcredit.MsgRetireCreditsResponse"
        );
    }
}
