//! Integration tests for the soap-datasource crate.
//!
//! These tests exercise the public API end-to-end against a local HTTP server
//! serving a WSDL document and SOAP responses.

use httpmock::prelude::*;
use serde_json::json;
use soap_datasource::{
    ConfigPatch, CredentialsMode, ErrorKind, FunctionMatch, Params, SoapSource, SoapSourceConfig,
};

// ============================================================================
// Fixtures
// ============================================================================

fn wsdl(location: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions name="gestao"
    targetNamespace="http://ws.gestao.example/"
    xmlns="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:tns="http://ws.gestao.example/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <message name="listarClientes">
    <part name="filtro" type="xsd:string"/>
  </message>
  <message name="listarClientesResponse">
    <part name="return" type="tns:ListaClientes"/>
  </message>
  <message name="contarClientes"/>
  <message name="contarClientesResponse">
    <part name="return" type="xsd:int"/>
  </message>
  <portType name="GestaoPortType">
    <operation name="listarClientes">
      <input message="tns:listarClientes"/>
      <output message="tns:listarClientesResponse"/>
    </operation>
    <operation name="contarClientes">
      <input message="tns:contarClientes"/>
      <output message="tns:contarClientesResponse"/>
    </operation>
  </portType>
  <binding name="GestaoBinding" type="tns:GestaoPortType">
    <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
    <operation name="listarClientes">
      <soap:operation soapAction="urn:listarClientes"/>
    </operation>
    <operation name="contarClientes">
      <soap:operation soapAction="urn:contarClientes"/>
    </operation>
  </binding>
  <service name="GestaoService">
    <port name="GestaoPort" binding="tns:GestaoBinding">
      <soap:address location="{location}"/>
    </port>
  </service>
</definitions>"#
    )
}

const LISTAR_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns1:listarClientesResponse xmlns:ns1="http://ws.gestao.example/">
      <return>
        <cliente>Ana</cliente>
        <cliente>Bruno</cliente>
      </return>
    </ns1:listarClientesResponse>
  </soap:Body>
</soap:Envelope>"#;

const CONTAR_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soap:Body>
    <ns1:contarClientesResponse xmlns:ns1="http://ws.gestao.example/">
      <return xsi:type="xsd:int">2</return>
    </ns1:contarClientesResponse>
  </soap:Body>
</soap:Envelope>"#;

const FAULT_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Filtro invalido</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

/// Basic auth for root:123456
const ROOT_AUTH: &str = "Basic cm9vdDoxMjM0NTY=";

fn config_for(server: &MockServer) -> SoapSourceConfig {
    SoapSourceConfig::new(server.url("/ws"), "gestao")
}

fn params(value: serde_json::Value) -> Params {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// End-to-end: successful calls
// ============================================================================

#[test]
fn test_e2e_query_returns_decoded_result() {
    let server = MockServer::start();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    let call_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/ws/gestao")
            .header("soapaction", "\"urn:listarClientes\"")
            .body_contains("<tns:listarClientes><filtro>A</filtro></tns:listarClientes>");
        then.status(200)
            .header("content-type", "text/xml; charset=utf-8")
            .body(LISTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    assert!(!source.is_connected());

    let result = source
        .query("listarClientes", params(json!({"filtro": "A"})))
        .unwrap();

    assert_eq!(result, json!({"cliente": ["Ana", "Bruno"]}));
    assert!(source.is_connected());
    wsdl_mock.assert_hits(1);
    call_mock.assert_hits(1);
}

#[test]
fn test_e2e_typed_scalar_result() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    server.mock(|when, then| {
        when.method(POST).path("/ws/gestao");
        then.status(200).body(CONTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    assert_eq!(source.query("contarClientes", Params::new()).unwrap(), json!(2));
}

#[test]
fn test_e2e_operations_listing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let source = SoapSource::new(config_for(&server));
    assert_eq!(
        source.operations().unwrap(),
        vec![
            "ListaClientes listarClientes(string $filtro)".to_string(),
            "int contarClientes()".to_string(),
        ]
    );
}

#[test]
fn test_e2e_every_query_reloads_wsdl() {
    let server = MockServer::start();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    server.mock(|when, then| {
        when.method(POST).path("/ws/gestao");
        then.status(200).body(CONTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    source.query("contarClientes", Params::new()).unwrap();
    source.query("contarClientes", Params::new()).unwrap();
    wsdl_mock.assert_hits(2);
}

// ============================================================================
// End-to-end: failures
// ============================================================================

#[test]
fn test_e2e_unknown_function_never_posts() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    let call_mock = server.mock(|when, then| {
        when.method(POST).path("/ws/gestao");
        then.status(200).body(CONTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    let err = source.query("excluirClientes", Params::new()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownOperation);
    assert!(err.to_string().contains("excluirClientes"));
    call_mock.assert_hits(0);
}

#[test]
fn test_e2e_partial_name_passes_check_but_call_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    let call_mock = server.mock(|when, then| {
        when.method(POST).path("/ws/gestao");
        then.status(200).body(LISTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    let err = source.query("list", Params::new()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCall);
    assert!(err.to_string().contains("is not a valid method"));
    call_mock.assert_hits(0);
}

#[test]
fn test_e2e_exact_match_rejects_partial_name() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let mut config = config_for(&server);
    config.function_match = FunctionMatch::Exact;
    let source = SoapSource::new(config);

    let err = source.query("list", Params::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownOperation);
}

#[test]
fn test_e2e_fault_becomes_invalid_call() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    server.mock(|when, then| {
        when.method(POST).path("/ws/gestao");
        then.status(500)
            .header("content-type", "text/xml; charset=utf-8")
            .body(FAULT_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server));
    let err = source
        .query("listarClientes", params(json!({"filtro": "?"})))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCall);
    assert_eq!(err.to_string(), "Invalid call: Filtro invalido");
}

#[test]
fn test_e2e_missing_wsdl_is_connection_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(404).body("Not Found");
    });

    let source = SoapSource::new(config_for(&server));
    let err = source.query("listarClientes", Params::new()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("SOAP-ERROR: Parsing WSDL"));
    assert!(!source.is_connected());
}

#[test]
fn test_e2e_invalid_wsdl_is_connection_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body("<html><body>maintenance</body></html>");
    });

    let source = SoapSource::new(config_for(&server));
    let err = source.connect().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!source.is_connected());
}

// ============================================================================
// End-to-end: client options
// ============================================================================

#[test]
fn test_e2e_default_options_accept_gzip() {
    let server = MockServer::start();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ws/gestao")
            .header("accept-encoding", "gzip");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let source = SoapSource::new(config_for(&server));
    source.connect().unwrap();
    wsdl_mock.assert_hits(1);
}

#[test]
fn test_e2e_credentials_sent_as_basic_auth() {
    let server = MockServer::start();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ws/gestao")
            .header("authorization", ROOT_AUTH);
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });
    let call_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/ws/gestao")
            .header("authorization", ROOT_AUTH);
        then.status(200).body(CONTAR_RESPONSE);
    });

    let source = SoapSource::new(config_for(&server).with_credentials("root", "123456"));
    assert_eq!(source.query("contarClientes", Params::new()).unwrap(), json!(2));
    wsdl_mock.assert_hits(1);
    call_mock.assert_hits(1);
}

#[test]
fn test_e2e_disk_cache_reuses_wsdl() {
    let server = MockServer::start();
    let cache_dir = tempfile::tempdir().unwrap();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let mut config = config_for(&server);
    config.cache = true;
    config.wsdl_cache_dir = Some(cache_dir.path().to_path_buf());
    let source = SoapSource::new(config);

    source.connect().unwrap();
    source.connect().unwrap();
    wsdl_mock.assert_hits(1);
}

#[test]
fn test_e2e_legacy_credentials_drop_disk_cache() {
    let server = MockServer::start();
    let cache_dir = tempfile::tempdir().unwrap();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET).path("/ws/gestao");
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let mut config = config_for(&server).with_credentials("root", "123456");
    config.cache = true;
    config.wsdl_cache_dir = Some(cache_dir.path().to_path_buf());
    let source = SoapSource::new(config);

    source.connect().unwrap();
    source.connect().unwrap();
    wsdl_mock.assert_hits(2);
}

#[test]
fn test_e2e_merged_credentials_keep_disk_cache() {
    let server = MockServer::start();
    let cache_dir = tempfile::tempdir().unwrap();
    let wsdl_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ws/gestao")
            .header("authorization", ROOT_AUTH);
        then.status(200).body(wsdl(&server.url("/ws/gestao")));
    });

    let mut config = config_for(&server).with_credentials("root", "123456");
    config.cache = true;
    config.credentials_options = CredentialsMode::Merge;
    config.wsdl_cache_dir = Some(cache_dir.path().to_path_buf());
    let source = SoapSource::new(config);

    source.connect().unwrap();
    source.connect().unwrap();
    wsdl_mock.assert_hits(1);
}

// ============================================================================
// End-to-end: reconfiguration
// ============================================================================

#[test]
fn test_e2e_set_config_switches_service() {
    let server = MockServer::start();
    let clientes_mock = server.mock(|when, then| {
        when.method(GET).path("/ws/clientes");
        then.status(200).body(wsdl(&server.url("/ws/clientes")));
    });

    let mut source = SoapSource::new(config_for(&server));
    source.set_config(ConfigPatch::service("clientes"));

    assert_eq!(
        source.debug_info().resolved_wsdl_url,
        format!("{}/clientes?wsdl", server.url("/ws"))
    );
    source.connect().unwrap();
    clientes_mock.assert_hits(1);
}
