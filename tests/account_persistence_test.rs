//! Accounts and payments persisted through the JSON file store

use chrono::NaiveDate;
use heybet::{
    accounts::{ACCOUNTS_KEY, SESSION_KEY},
    errors::AuthError,
    payments::{CardDetails, PaymentMethod},
    AuthService, HeyBetError, JsonFileStore, KeyValueStore, Ledger, PaymentDesk, PaymentKind,
    PaymentRequest, RegistrationForm, SeededRng,
};
use tempfile::TempDir;

fn form(email: &str, birth_date: &str) -> RegistrationForm {
    RegistrationForm {
        email: email.to_string(),
        password: "senha-forte".to_string(),
        name: "Maria Silva".to_string(),
        cpf: "987.654.321-00".to_string(),
        phone: "(21) 98888-7777".to_string(),
        birth_date: birth_date.to_string(),
        profile_image: None,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

#[test]
fn test_accounts_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("heybet.json");

    {
        let mut auth = AuthService::new(JsonFileStore::open(&path).unwrap());
        auth.register(&form("maria@heybet.com", "1995-08-20"), today())
            .unwrap();
        auth.logout().unwrap();
    }

    let mut auth = AuthService::new(JsonFileStore::open(&path).unwrap());
    assert!(auth.restore_session().unwrap().is_none());
    assert_eq!(auth.accounts().unwrap().len(), 1);

    let profile = auth.login("maria@heybet.com", "senha-forte").unwrap();
    assert_eq!(profile.name, "Maria Silva");
    assert!(!profile.is_verified);

    // The session itself is persisted too
    let restored = AuthService::new(JsonFileStore::open(&path).unwrap())
        .restore_session()
        .unwrap()
        .map(|p| p.email.clone());
    assert_eq!(restored.as_deref(), Some("maria@heybet.com"));
}

#[test]
fn test_underage_registration_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("heybet.json");
    let mut auth = AuthService::new(JsonFileStore::open(&path).unwrap());

    // Turns 18 one day after `today`
    let error = auth
        .register(&form("jovem@heybet.com", "2007-03-11"), today())
        .unwrap_err();

    let fields = error.field_errors().expect("field errors");
    assert!(fields.contains("birth_date"));
    assert_eq!(fields.len(), 1);

    assert!(auth.store().get(ACCOUNTS_KEY).unwrap().is_none());
    assert!(auth.store().get(SESSION_KEY).unwrap().is_none());
    assert!(!path.exists());
}

#[test]
fn test_duplicate_registration_across_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("heybet.json");

    AuthService::new(JsonFileStore::open(&path).unwrap())
        .register(&form("ana@heybet.com", "1980-01-01"), today())
        .unwrap();

    let mut auth = AuthService::new(JsonFileStore::open(&path).unwrap());
    assert!(matches!(
        auth.register(&form("ana@heybet.com", "1980-01-01"), today()),
        Err(HeyBetError::Auth(AuthError::AccountExists(_)))
    ));
}

#[test]
fn test_deposit_then_withdraw() {
    let desk = PaymentDesk::default();
    let mut ledger = Ledger::new(0.0);
    let mut rng = SeededRng::from_seed(10);

    let deposit = PaymentRequest {
        kind: PaymentKind::Deposit,
        amount: 500.0,
        method: PaymentMethod::Card(CardDetails {
            number: "5555 4444 3333 2222".to_string(),
            holder: "MARIA SILVA".to_string(),
            expiry: "08/30".to_string(),
            cvv: "321".to_string(),
        }),
    };
    let payment = desk.prepare(&deposit, ledger.balance(), &mut rng).unwrap();
    desk.complete(payment, &mut ledger).unwrap();
    assert_eq!(ledger.balance(), 500.0);

    let withdraw = PaymentRequest {
        kind: PaymentKind::Withdraw,
        amount: 120.0,
        method: PaymentMethod::Pix,
    };
    let payment = desk.prepare(&withdraw, ledger.balance(), &mut rng).unwrap();
    let code = payment.pix_code.clone().unwrap();
    assert!(code.starts_with("00020126580014BR.GOV.BCB.PIX0136"));
    assert_eq!(&code[code.len() - 8..code.len() - 4], "6304");

    let receipt = desk.complete(payment, &mut ledger).unwrap();
    assert_eq!(receipt.balance_after, 380.0);
    assert_eq!(ledger.history().len(), 0);
}
