pub mod posting_request;
