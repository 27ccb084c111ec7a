//! Ticket issue/redeem workflow tests

use std::time::Duration;

use vc_ticket::utils::imaging::base64_to_bytes;
use vc_ticket::{
    Config, ErrorKind, MemoryTicketStore, SigningSecret, TicketService, TicketStatus, TicketStore,
};

const NOW: i64 = 1_700_000_000;

fn service() -> TicketService<MemoryTicketStore> {
    let config = Config::new(SigningSecret::new("redemption-secret"))
        .with_rate_limit_window(Duration::ZERO);
    TicketService::new(&config, MemoryTicketStore::new()).unwrap()
}

#[test]
fn test_issue_and_redeem_with_extracted_code() {
    let service = service();
    let issued = service.issue_at("Grace", "grace@example.com", NOW).unwrap();
    let share_a = base64_to_bytes(&issued.share_a_base64).unwrap();

    let redemption = service.redeem_at(&share_a, None, NOW + 60).unwrap();
    assert_eq!(redemption.strategy, "fiducial");
    assert_eq!(redemption.fields.name, "Grace");
    assert_eq!(redemption.fields.user_uuid, issued.user_uuid);
    assert!(!redemption.stacked_base64.is_empty());

    let ticket = service
        .store()
        .find_by_check_in_code(&issued.check_in_code)
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Redeemed);
    assert_eq!(ticket.redeemed_at, Some(NOW + 60));
}

#[test]
fn test_concurrent_redemptions_have_one_winner() {
    let service = service();
    let issued = service.issue_at("Grace", "grace@example.com", NOW).unwrap();
    let share_a = base64_to_bytes(&issued.share_a_base64).unwrap();
    let code = issued.check_in_code.as_str();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| s.spawn(|| service.redeem_at(&share_a, Some(code), NOW + 60)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::AlreadyRedeemed);
}

#[test]
fn test_share_from_another_ticket_is_rejected_with_debug_images() {
    let service = service();
    let first = service.issue_at("Grace", "grace@example.com", NOW).unwrap();
    let second = service.issue_at("Alan", "alan@example.com", NOW).unwrap();
    let share_a = base64_to_bytes(&first.share_a_base64).unwrap();

    let rejection = service
        .redeem_at(&share_a, Some(&second.check_in_code), NOW + 60)
        .unwrap_err();
    assert_eq!(rejection.kind(), ErrorKind::AlignmentExhausted);
    assert!(rejection.stacked_base64.is_some());
    assert!(rejection.aligned_share_a_base64.is_some());

    // the targeted ticket is untouched
    let ticket = service
        .store()
        .find_by_check_in_code(&second.check_in_code)
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Active);
}

#[test]
fn test_expired_ticket_stays_expired() {
    let service = service();
    let issued = service.issue_at("Grace", "grace@example.com", NOW).unwrap();
    let share_a = base64_to_bytes(&issued.share_a_base64).unwrap();
    let code = Some(issued.check_in_code.as_str());

    let late = NOW + 86_400 + 1;
    assert_eq!(
        service.redeem_at(&share_a, code, late).unwrap_err().kind(),
        ErrorKind::TicketExpired
    );
    // terminal: even a redemption "back in time" cannot revive it
    assert_eq!(
        service.redeem_at(&share_a, code, NOW + 60).unwrap_err().kind(),
        ErrorKind::TicketExpired
    );
}

#[test]
fn test_issued_artifacts_are_well_formed() {
    let service = service();
    let issued = service.issue_at("Grace", "grace@example.com", NOW).unwrap();

    let code_png = base64_to_bytes(&issued.code_qr_base64).unwrap();
    let code_img = image::load_from_memory(&code_png).unwrap().to_luma8();
    assert_eq!(
        vc_ticket::qr::decode(&code_img).as_deref(),
        Some(issued.check_in_code.as_str())
    );

    let json = serde_json::to_value(&issued).unwrap();
    assert_eq!(json["check_in_code"], issued.check_in_code.as_str());
    assert!(json["original_payload"].as_str().unwrap().contains(&issued.user_uuid));
}
