//! Integration tests for dirmirror-remote
//!
//! Uses wiremock to simulate the disk REST API and verifies the
//! DiskRemoteConnector's requests and its mapping of responses to
//! RemoteError.


mod test_delete;
mod test_list;
mod test_upload;
