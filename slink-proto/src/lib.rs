pub mod decode;
pub mod encode;
pub mod flow;
/// The sockslink authentication helper protocol
///
/// The proxy writes one request per line on the helper's stdin, the helper
/// answers with exactly one verdict per line on its stdout. Fields are
/// separated by a single space, credentials are percent-encoded.
///
/// ## Trace
///
/// ```text
/// C: c1 none
/// S: OK ! none
///
/// C: c2 username test test123
/// S: OK ! username test
///
/// C: c3 username test%40localhost test123
/// S: OK 127.0.0.1:1080 username test
///
/// C: c4 username test@nowhere test123
/// S: ERR Unknown server
///
/// C: c5 username test wrong
/// S: ERR Authentication failure (bad password)
///
/// C: c6 gssapi
/// S: ERR Invalid number of argument
/// ```
///
/// Diagnostics never go to stdout: the proxy reads the helper's stderr
/// separately and only logs it.
pub mod types;
