//! 內建交易設定：query、payment、reversal 的範本，映射規則預設為空。

use crate::domain::model::{Template, TransactionConfig, TransactionType};
use std::collections::BTreeMap;

const QUERY_XML_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<consulta>
    <cliente>
        <numeroDocumento>{cliente.documento}</numeroDocumento>
        <tipoDocumento>{cliente.tipoDocumento}</tipoDocumento>
    </cliente>
    <cuenta>
        <numero>{cuenta.numero}</numero>
        <tipo>{cuenta.tipo}</tipo>
    </cuenta>
    <tipoConsulta>{tipoConsulta}</tipoConsulta>
    <timestamp>{timestamp}</timestamp>
</consulta>"#;

const QUERY_JSON_REQUEST: &str = r#"{
    "queryType": "{tipoConsulta}",
    "customer": {
        "documentNumber": "{cliente.documento}",
        "documentType": "{cliente.tipoDocumento}"
    },
    "account": {
        "number": "{cuenta.numero}",
        "type": "{cuenta.tipo}"
    },
    "requestTime": "{timestamp}"
}"#;

const QUERY_JSON_RESPONSE: &str = r#"{
    "success": true,
    "account": {
        "number": "1234567890",
        "type": "savings",
        "status": "active",
        "balance": 1500.75,
        "currency": "GTQ"
    },
    "customer": {
        "name": "Juan Pérez",
        "status": "active"
    },
    "queryTime": "2025-10-16T12:00:00Z"
}"#;

const QUERY_XML_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<respuestaConsulta>
    <resultado>
        <exito>{success}</exito>
        <cuenta>
            <numero>{account.number}</numero>
            <tipo>{account.type}</tipo>
            <estado>{account.status}</estado>
            <saldo>{account.balance}</saldo>
            <moneda>{account.currency}</moneda>
        </cuenta>
        <cliente>
            <nombre>{customer.name}</nombre>
            <estado>{customer.status}</estado>
        </cliente>
        <fechaConsulta>{queryTime}</fechaConsulta>
    </resultado>
</respuestaConsulta>"#;

const PAYMENT_XML_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pago>
    <transaccion>
        <id>{transaccion.id}</id>
        <monto>{transaccion.monto}</monto>
        <moneda>{transaccion.moneda}</moneda>
        <descripcion>{transaccion.descripcion}</descripcion>
    </transaccion>
    <cuentaOrigen>
        <numero>{cuentaOrigen.numero}</numero>
        <tipo>{cuentaOrigen.tipo}</tipo>
    </cuentaOrigen>
    <cuentaDestino>
        <numero>{cuentaDestino.numero}</numero>
        <banco>{cuentaDestino.banco}</banco>
    </cuentaDestino>
    <cliente>
        <nombre>{cliente.nombre}</nombre>
        <email>{cliente.email}</email>
        <telefono>{cliente.telefono}</telefono>
    </cliente>
    <timestamp>{timestamp}</timestamp>
</pago>"#;

const PAYMENT_JSON_REQUEST: &str = r#"{
    "transactionId": "{transaccion.id}",
    "amount": "{transaccion.monto}",
    "currency": "{transaccion.moneda}",
    "description": "{transaccion.descripcion}",
    "sourceAccount": {
        "number": "{cuentaOrigen.numero}",
        "type": "{cuentaOrigen.tipo}"
    },
    "targetAccount": {
        "number": "{cuentaDestino.numero}",
        "bankCode": "{cuentaDestino.banco}"
    },
    "customer": {
        "fullName": "{cliente.nombre}",
        "email": "{cliente.email}",
        "phone": "{cliente.telefono}"
    },
    "requestTime": "{timestamp}"
}"#;

const PAYMENT_JSON_RESPONSE: &str = r#"{
    "success": true,
    "transactionId": "TXN-12345",
    "status": "approved",
    "authorizationCode": "AUTH-789",
    "amount": 150.50,
    "currency": "GTQ",
    "processedAt": "2025-10-16T12:30:00Z",
    "reference": "REF-456",
    "fees": 2.50
}"#;

const PAYMENT_XML_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<respuestaPago>
    <resultado>
        <exito>{success}</exito>
        <transaccionId>{transactionId}</transaccionId>
        <estado>{status}</estado>
        <codigoAutorizacion>{authorizationCode}</codigoAutorizacion>
        <monto>{amount}</monto>
        <moneda>{currency}</moneda>
        <fechaProcesamiento>{processedAt}</fechaProcesamiento>
        <referencia>{reference}</referencia>
        <comisiones>{fees}</comisiones>
    </resultado>
</respuestaPago>"#;

const REVERSAL_XML_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<reversa>
    <transaccionOriginal>
        <id>{transaccionOriginal.id}</id>
        <fecha>{transaccionOriginal.fecha}</fecha>
        <monto>{transaccionOriginal.monto}</monto>
        <referencia>{transaccionOriginal.referencia}</referencia>
    </transaccionOriginal>
    <motivoReversa>{motivoReversa}</motivoReversa>
    <montoReversa>{montoReversa}</montoReversa>
    <solicitante>
        <usuario>{solicitante.usuario}</usuario>
        <rol>{solicitante.rol}</rol>
    </solicitante>
    <timestamp>{timestamp}</timestamp>
</reversa>"#;

const REVERSAL_JSON_REQUEST: &str = r#"{
    "originalTransaction": {
        "transactionId": "{transaccionOriginal.id}",
        "date": "{transaccionOriginal.fecha}",
        "amount": "{transaccionOriginal.monto}",
        "reference": "{transaccionOriginal.referencia}"
    },
    "reversalReason": "{motivoReversa}",
    "reversalAmount": "{montoReversa}",
    "requestedBy": {
        "user": "{solicitante.usuario}",
        "role": "{solicitante.rol}"
    },
    "requestTime": "{timestamp}"
}"#;

const REVERSAL_JSON_RESPONSE: &str = r#"{
    "success": true,
    "reversalId": "REV-12345",
    "originalTransactionId": "TXN-12345",
    "status": "approved",
    "reversedAmount": 150.50,
    "currency": "GTQ",
    "processedAt": "2025-10-16T13:00:00Z",
    "newBalance": 1351.25
}"#;

const REVERSAL_XML_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<respuestaReversa>
    <resultado>
        <exito>{success}</exito>
        <reversaId>{reversalId}</reversaId>
        <transaccionOriginalId>{originalTransactionId}</transaccionOriginalId>
        <estado>{status}</estado>
        <montoReversado>{reversedAmount}</montoReversado>
        <moneda>{currency}</moneda>
        <fechaProcesamiento>{processedAt}</fechaProcesamiento>
        <nuevoSaldo>{newBalance}</nuevoSaldo>
    </resultado>
</respuestaReversa>"#;

fn templated(xml_request: &str, json_request: &str, json_response: &str, xml_response: &str) -> TransactionConfig {
    TransactionConfig {
        xml_request_template: Template::new(xml_request),
        json_request_template: Template::new(json_request),
        json_response_template: Template::new(json_response),
        xml_response_template: Template::new(xml_response),
        ..Default::default()
    }
}

pub fn builtin_configurations() -> BTreeMap<TransactionType, TransactionConfig> {
    BTreeMap::from([
        (
            TransactionType::query(),
            templated(QUERY_XML_REQUEST, QUERY_JSON_REQUEST, QUERY_JSON_RESPONSE, QUERY_XML_RESPONSE),
        ),
        (
            TransactionType::payment(),
            templated(
                PAYMENT_XML_REQUEST,
                PAYMENT_JSON_REQUEST,
                PAYMENT_JSON_RESPONSE,
                PAYMENT_XML_RESPONSE,
            ),
        ),
        (
            TransactionType::reversal(),
            templated(
                REVERSAL_XML_REQUEST,
                REVERSAL_JSON_REQUEST,
                REVERSAL_JSON_RESPONSE,
                REVERSAL_XML_RESPONSE,
            ),
        ),
    ])
}
