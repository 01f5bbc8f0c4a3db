use base64::{Engine, prelude::BASE64_STANDARD};

pub const CA_BYTES: &[u8] = b"ca-bytes";
pub const CERT_BYTES: &[u8] = b"cert-bytes";
pub const KEY_BYTES: &[u8] = b"key-bytes";

/// Builds access config documents as written by the control pod of a cluster.
#[derive(Debug, Clone)]
pub struct AccessConfigBuilder {
    include_cluster: bool,
    include_user: bool,
    ca_data: String,
    cert_data: String,
    key_data: String,
}

impl AccessConfigBuilder {
    /// A document with one cluster and one user carrying [`CA_BYTES`], [`CERT_BYTES`] and
    /// [`KEY_BYTES`].
    pub fn new() -> Self {
        Self {
            include_cluster: true,
            include_user: true,
            ca_data: BASE64_STANDARD.encode(CA_BYTES),
            cert_data: BASE64_STANDARD.encode(CERT_BYTES),
            key_data: BASE64_STANDARD.encode(KEY_BYTES),
        }
    }

    pub fn without_clusters(mut self) -> Self {
        self.include_cluster = false;
        self
    }

    pub fn without_users(mut self) -> Self {
        self.include_user = false;
        self
    }

    /// Sets the raw, already encoded, value of `certificate-authority-data`.
    pub fn ca_data(mut self, encoded: impl Into<String>) -> Self {
        self.ca_data = encoded.into();
        self
    }

    /// Sets the raw, already encoded, value of `client-key-data`.
    pub fn key_data(mut self, encoded: impl Into<String>) -> Self {
        self.key_data = encoded.into();
        self
    }

    pub fn build(&self) -> String {
        let mut document = String::from("apiVersion: v1\nkind: Config\n");

        if self.include_cluster {
            document.push_str(&format!(
                "clusters:\n- name: my-vcluster\n  cluster:\n    server: https://localhost:8443\n    certificate-authority-data: \"{}\"\n",
                self.ca_data
            ));
        } else {
            document.push_str("clusters: []\n");
        }

        if self.include_user {
            document.push_str(&format!(
                "users:\n- name: my-vcluster\n  user:\n    client-certificate-data: \"{}\"\n    client-key-data: \"{}\"\n",
                self.cert_data, self.key_data
            ));
        } else {
            document.push_str("users: []\n");
        }

        document.push_str("current-context: my-vcluster\n");
        document
    }
}

impl Default for AccessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
