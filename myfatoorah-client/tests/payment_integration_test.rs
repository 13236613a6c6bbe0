//! Integration tests for the payment and shipping services.
//!
//! Tests end-to-end flows against a scripted transport that answers by endpoint.

use std::{str::FromStr, sync::Arc, sync::Mutex};

use myfatoorah_client::{
    ApiError, GatewayClient, GatewayError, PaymentService, ShippingService,
    error::Result,
    payment::{
        ApplePayMode, Card, CardInfo, InvoiceStatus, KeyType, OrderExpectation,
        PaymentMethodsCache, PaymentRequest,
    },
    shipping::ShippingMethod,
    transport::{HttpRequest, Method, Transport, TransportResponse},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    url: String,
    body: Option<Value>,
}

/// Answers each request with the body of the first route whose needle the URL contains.
struct ScriptedTransport {
    routes: Vec<(&'static str, String)>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    fn new(routes: Vec<(&'static str, String)>) -> Self {
        Self { routes, requests: Mutex::new(Vec::new()) }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send<'a>(&'a self, request: HttpRequest<'a>) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            url: request.url.to_owned(),
            body: request.body.map(|b| serde_json::from_slice(b).unwrap()),
        });

        let body = self
            .routes
            .iter()
            .find(|(needle, _)| request.url.contains(needle))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| GatewayError::Transport(format!("no route for {}", request.url)))?;

        Ok(TransportResponse { status: 200, body: body.into_bytes(), headers: vec![] })
    }

    fn protocol_name(&self) -> &'static str {
        "scripted"
    }
}

fn client(routes: Vec<(&'static str, String)>) -> Arc<GatewayClient<ScriptedTransport>> {
    Arc::new(GatewayClient::new(
        ScriptedTransport::new(routes),
        "https://apitest.myfatoorah.com",
        "token",
    ))
}

fn payments(routes: Vec<(&'static str, String)>) -> PaymentService<ScriptedTransport> {
    PaymentService::new(client(routes))
}

fn success(data: &Value) -> String {
    json!({"IsSuccess": true, "Message": "", "ValidationErrors": null, "Data": data}).to_string()
}

fn rates_body() -> String {
    json!([{"Text": "KWD", "Value": 1.0}, {"Text": "USD", "Value": 3.25}]).to_string()
}

fn invoice(status: &str, transactions: &Value) -> Value {
    json!({
        "InvoiceId": 2047578,
        "InvoiceStatus": status,
        "CustomerReference": "1001",
        "ExpiryDate": "January 1, 2100",
        "ExpiryTime": "00:00:00.000",
        "InvoiceValue": 10.5,
        "InvoiceDisplayValue": "10.500 KD",
        "InvoiceTransactions": transactions
    })
}

fn request() -> PaymentRequest {
    PaymentRequest {
        customer_name: "Fatima".to_owned(),
        invoice_value: Decimal::from_str("10.500").unwrap(),
        display_currency_iso: Some("KWD".to_owned()),
        customer_reference: Some("1001".to_owned()),
        ..PaymentRequest::default()
    }
}

#[tokio::test]
async fn test_payment_status_paid_flow() {
    let data = invoice(
        "Paid",
        &json!([{"PaymentId": "0707", "TransactionStatus": "Succss", "PaymentGateway": "KNET"}]),
    );
    let service = payments(vec![("GetPaymentStatus", success(&data))]);

    let expectation =
        OrderExpectation::order("1001").with_amount(Decimal::from_str("10.5").unwrap(), "KD");
    let result = service.payment_status("0707", KeyType::PaymentId, &expectation).await.unwrap();

    assert_eq!(result.status, InvoiceStatus::Paid);
    assert_eq!(result.focus_transaction.unwrap().payment_gateway, "KNET");

    let sent = service.client().transport().requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].url, "https://apitest.myfatoorah.com/v2/GetPaymentStatus");
    assert_eq!(sent[0].body, Some(json!({"Key": "0707", "KeyType": "PaymentId"})));
}

#[tokio::test]
async fn test_payment_status_pending_flow() {
    let service = payments(vec![("GetPaymentStatus", success(&invoice("Pending", &json!([]))))]);

    let result = service
        .payment_status("2047578", KeyType::InvoiceId, &OrderExpectation::default())
        .await
        .unwrap();

    assert_eq!(result.status, InvoiceStatus::Pending);
    assert_eq!(result.error_text, "Pending Payment.");
}

#[tokio::test]
async fn test_payment_status_of_another_order() {
    let service = payments(vec![("GetPaymentStatus", success(&invoice("Paid", &json!([]))))]);

    let err = service
        .payment_status("0707", KeyType::PaymentId, &OrderExpectation::order("2002"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Mismatch(_)));
    assert!(err.to_string().starts_with("Trying to call data of another order"));
}

#[tokio::test]
async fn test_validation_errors_surface_as_api_error() {
    let body = json!({
        "IsSuccess": false,
        "Message": "Invalid data",
        "ValidationErrors": [{"Name": "Key", "Error": "Invalid key"}],
        "Data": null
    })
    .to_string();
    let service = payments(vec![("GetPaymentStatus", body)]);

    let err = service
        .payment_status("x", KeyType::PaymentId, &OrderExpectation::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.as_api_error(),
        Some(&ApiError::Validation(vec![("Key".to_owned(), "Invalid key".to_owned())]))
    );
    assert_eq!(err.to_string(), "Key: Invalid key");
}

#[tokio::test]
async fn test_html_error_page_surfaces_as_api_error() {
    let service = payments(vec![(
        "GetPaymentStatus",
        "<html><body><h1>403 Forbidden</h1></body></html>".to_owned(),
    )]);

    let err = service
        .payment_status("x", KeyType::PaymentId, &OrderExpectation::default())
        .await
        .unwrap_err();

    assert_eq!(err.as_api_error(), Some(&ApiError::Html("403 Forbidden".to_owned())));
}

#[tokio::test]
async fn test_invoice_url_send_payment() {
    let data = json!({"InvoiceId": 42, "InvoiceURL": "https://demo.myfatoorah.com/KWT/ie/42"});
    let service = payments(vec![("SendPayment", success(&data))]);

    let url = service.invoice_url(&request(), "myfatoorah", None, Some("1001")).await.unwrap();

    assert_eq!(url.invoice_id, "42");
    assert_eq!(url.invoice_url, "https://demo.myfatoorah.com/KWT/ie/42");

    let sent = service.client().transport().requests();
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["NotificationOption"], "Lnk");
    assert_eq!(body["CustomerName"], "Fatima");
    assert!(body.get("PaymentMethodId").is_none());
}

#[tokio::test]
async fn test_invoice_url_execute_payment() {
    let data = json!({"InvoiceId": 43, "PaymentURL": "https://demo.myfatoorah.com/En/KWT/PayInvoice/43"});
    let service = payments(vec![("ExecutePayment", success(&data))]);

    let url = service.invoice_url(&request(), "2", None, None).await.unwrap();

    assert_eq!(url.invoice_id, "43");
    let sent = service.client().transport().requests();
    assert_eq!(sent[0].url, "https://apitest.myfatoorah.com/v2/ExecutePayment");
    assert_eq!(sent[0].body.as_ref().unwrap()["PaymentMethodId"], json!(2));
}

#[tokio::test]
async fn test_invoice_url_embedded_session_wins() {
    let data = json!({"InvoiceId": 44, "PaymentURL": "https://demo.myfatoorah.com/pay/44"});
    let service = payments(vec![("ExecutePayment", success(&data))]);

    service.invoice_url(&request(), "2", Some("session-1"), None).await.unwrap();

    let body = service.client().transport().requests()[0].body.clone().unwrap();
    assert_eq!(body["SessionId"], "session-1");
    assert!(body.get("PaymentMethodId").is_none());
}

#[tokio::test]
async fn test_direct_payment_posts_card_to_returned_url() {
    let executed = json!({"InvoiceId": 45, "PaymentURL": "https://apitest.myfatoorah.com/v2/DirectPayment/45/20"});
    let paid = json!({"Status": "SUCCESS", "PaymentId": "0707", "PaymentURL": "https://demo.myfatoorah.com/otp/45"});
    let service = payments(vec![
        ("ExecutePayment", success(&executed)),
        ("DirectPayment", success(&paid)),
    ]);

    let card = CardInfo {
        payment_type: "card".to_owned(),
        bypass_3ds: false,
        save_token: false,
        card: Some(Card {
            number: "5123450000000008".to_owned(),
            expiry_month: "05".to_owned(),
            expiry_year: "30".to_owned(),
            security_code: "100".to_owned(),
            card_holder_name: Some("Fatima".to_owned()),
        }),
        token: None,
    };

    let url = service.direct_payment(&request(), "20", &card, Some("1001")).await.unwrap();

    assert_eq!(url.invoice_id, "45");
    assert_eq!(url.invoice_url, "https://demo.myfatoorah.com/otp/45");

    let sent = service.client().transport().requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].url, "https://apitest.myfatoorah.com/v2/DirectPayment/45/20");
    assert_eq!(sent[1].body.as_ref().unwrap()["Card"]["Number"], "5123450000000008");
}

#[tokio::test]
async fn test_refund_converts_into_account_currency() {
    let service = payments(vec![
        ("GetCurrenciesExchangeList", rates_body()),
        ("MakeRefund", success(&json!({"Key": "0707", "RefundId": 1}))),
    ]);

    service
        .refund("0707", Decimal::from_str("32.5").unwrap(), "USD", "damaged", Some("1001"))
        .await
        .unwrap();

    let sent = service.client().transport().requests();
    assert_eq!(sent[0].method, Method::Get);
    let body = sent[1].body.as_ref().unwrap();
    assert_eq!(body["KeyType"], "PaymentId");
    assert_eq!(body["Key"], "0707");
    assert_eq!(body["RefundChargeOnCustomer"], false);
    assert_eq!(body["ServiceChargeOnCustomer"], false);
    assert_eq!(body["Amount"].to_string(), "10");
    assert_eq!(body["Comment"], "damaged");
}

#[tokio::test]
async fn test_refund_in_unsupported_currency() {
    let service = payments(vec![("GetCurrenciesExchangeList", rates_body())]);

    let err = service
        .refund("0707", Decimal::ONE, "EUR", "damaged", None)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::UnsupportedCurrency(c) if c == "EUR"));
    assert_eq!(service.client().transport().requests().len(), 1);
}

#[tokio::test]
async fn test_payment_methods_for_display_uses_cache() {
    let methods = json!({"PaymentMethods": [
        {"PaymentMethodId": 1, "PaymentMethodCode": "kn", "PaymentMethodEn": "KNET",
         "IsDirectPayment": false, "IsEmbeddedSupported": false,
         "TotalAmount": 10, "CurrencyIso": "KWD", "PaymentCurrencyIso": "KWD"},
        {"PaymentMethodId": 2, "PaymentMethodCode": "vm", "PaymentMethodEn": "VISA/MASTER",
         "IsDirectPayment": false, "IsEmbeddedSupported": true,
         "TotalAmount": 10, "CurrencyIso": "KWD", "PaymentCurrencyIso": "USD"},
        {"PaymentMethodId": 11, "PaymentMethodCode": "ap", "PaymentMethodEn": "Apple Pay",
         "IsDirectPayment": false, "IsEmbeddedSupported": false,
         "TotalAmount": 10, "CurrencyIso": "KWD", "PaymentCurrencyIso": "KWD"}
    ]});
    let service = payments(vec![
        ("InitiatePayment", success(&methods)),
        ("GetCurrenciesExchangeList", rates_body()),
    ]);
    let cache = PaymentMethodsCache::new();

    let grouped = service
        .payment_methods_for_display(Decimal::TEN, "KWD", ApplePayMode::Registered, &cache)
        .await
        .unwrap();

    assert_eq!(grouped.all.len(), 3);
    assert_eq!(grouped.cards.len(), 1);
    assert_eq!(grouped.form.len(), 1);
    assert_eq!(grouped.apple_pay.as_ref().unwrap().payment_method_id, 11);

    let visa = &grouped.form[0];
    let data = visa.gateway_data.as_ref().unwrap();
    assert_eq!(data.currency, "USD");
    assert_eq!(data.amount, Decimal::from_str("32.5").unwrap());

    let again = service
        .payment_methods_for_display(Decimal::TEN, "KWD", ApplePayMode::Hidden, &cache)
        .await
        .unwrap();
    assert_eq!(again, grouped);
    assert_eq!(service.client().transport().requests().len(), 2);

    cache.invalidate();
    let hidden = service
        .payment_methods_for_display(Decimal::TEN, "KWD", ApplePayMode::Hidden, &cache)
        .await
        .unwrap();
    assert!(hidden.apple_pay.is_none());
    assert_eq!(hidden.all.len(), 2);
}

#[tokio::test]
async fn test_register_apple_pay_domain_sends_host() {
    let service = payments(vec![("RegisterApplePayDomain", success(&json!({"Message": "ok"})))]);

    service.register_apple_pay_domain("https://shop.example.com/checkout?x=1").await.unwrap();

    let body = service.client().transport().requests()[0].body.clone().unwrap();
    assert_eq!(body, json!({"DomainName": "shop.example.com"}));

    assert!(matches!(
        service.register_apple_pay_domain("not a url").await,
        Err(GatewayError::Config(_))
    ));
}

#[tokio::test]
async fn test_embedded_session_returns_data() {
    let data = json!({"SessionId": "abc", "CountryCode": "KWT"});
    let service = payments(vec![("InitiateSession", success(&data))]);

    let session = service.embedded_session("customer-7", None).await.unwrap();

    assert_eq!(session, data);
    let body = service.client().transport().requests()[0].body.clone().unwrap();
    assert_eq!(body, json!({"CustomerIdentifier": "customer-7"}));
}

#[tokio::test]
async fn test_shipping_cities_query() {
    let shipping = ShippingService::new(client(vec![(
        "GetCities",
        success(&json!({"CityNames": ["Kuwait City"]})),
    )]));

    let json = shipping.cities(ShippingMethod::Dhl, "KW", "kuwait city").await.unwrap();

    assert_eq!(json["Data"]["CityNames"][0], "Kuwait City");
}

#[tokio::test]
async fn test_transport_failure_is_not_classified() {
    let service = payments(vec![]);

    let err = service
        .payment_status("x", KeyType::PaymentId, &OrderExpectation::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Transport(_)));
}
