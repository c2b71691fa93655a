//! Tests for the canary service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::{CanaryId, CanaryProfile};
use crate::domain::ports::{
    CanaryRepositoryError, DocumentStorageError, MockCanaryRepository, MockDocumentStorage,
    MockDomainVerifier, MockOneTimePasswordValidator, MockTrustedCanaryRepository,
    OneTimePasswordError, StoredDocument,
};
use crate::test_support::{MutableClock, fixed_now, sample_canary};

type Service = CanaryService<
    MockCanaryRepository,
    MockTrustedCanaryRepository,
    MockDomainVerifier,
    MockOneTimePasswordValidator,
    MockDocumentStorage,
>;

fn service(
    canaries: MockCanaryRepository,
    trusted: MockTrustedCanaryRepository,
    verifier: MockDomainVerifier,
    otp: MockOneTimePasswordValidator,
) -> Service {
    with_logos(canaries, trusted, verifier, otp, MockDocumentStorage::new())
}

fn with_logos(
    canaries: MockCanaryRepository,
    trusted: MockTrustedCanaryRepository,
    verifier: MockDomainVerifier,
    otp: MockOneTimePasswordValidator,
    logos: MockDocumentStorage,
) -> Service {
    CanaryService::new(
        Arc::new(canaries),
        Arc::new(trusted),
        Arc::new(verifier),
        Arc::new(otp),
        Arc::new(logos),
        Arc::new(MutableClock::new(fixed_now())),
    )
}

fn logo_service(canaries: MockCanaryRepository, logos: MockDocumentStorage) -> Service {
    with_logos(
        canaries,
        MockTrustedCanaryRepository::new(),
        MockDomainVerifier::new(),
        MockOneTimePasswordValidator::new(),
        logos,
    )
}

fn logo_upload() -> DocumentUpload {
    DocumentUpload {
        filename: "logo.png".to_owned(),
        content: b"\x89PNG".to_vec(),
    }
}

fn stored_logo(
    file_ref: &'static str,
) -> impl FnOnce(&DocumentUpload) -> Result<StoredDocument, DocumentStorageError> {
    move |_| {
        Ok(StoredDocument {
            file_ref: file_ref.to_owned(),
            size: 4,
        })
    }
}

fn canaries_only(canaries: MockCanaryRepository) -> Service {
    service(
        canaries,
        MockTrustedCanaryRepository::new(),
        MockDomainVerifier::new(),
        MockOneTimePasswordValidator::new(),
    )
}

fn domain() -> CanaryDomain {
    CanaryDomain::new("Example.ORG").expect("valid domain")
}

#[tokio::test]
async fn create_canary_rejects_taken_domain() {
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_is_domain_taken()
        .return_once(|_, _| Ok(true));
    canaries.expect_insert().times(0);

    let err = canaries_only(canaries)
        .create_canary(CreateCanaryRequest {
            domain: domain(),
            profile: CanaryProfile::new("Example", "").expect("valid profile"),
            caller: UserId::random(),
        })
        .await
        .expect_err("taken");
    assert_eq!(err, CanaryError::CanaryTaken);
}

#[tokio::test]
async fn create_canary_starts_unverified_with_challenge() {
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_is_domain_taken()
        .return_once(|_, _| Ok(false));
    canaries.expect_insert().times(1).return_once(|_| Ok(()));
    let caller = UserId::random();

    let canary = canaries_only(canaries)
        .create_canary(CreateCanaryRequest {
            domain: domain(),
            profile: CanaryProfile::new("Example", "").expect("valid profile"),
            caller: caller.clone(),
        })
        .await
        .expect("registered");
    assert_eq!(canary.domain.as_str(), "example.org");
    assert_eq!(canary.owner, caller);
    assert!(!canary.is_verified());
    assert_eq!(canary.verification.code.len(), 43);
    assert_eq!(canary.created, fixed_now());
}

#[rstest]
#[case(true, Ok(()))]
#[case(false, Err(CanaryError::DomainVerificationFailed))]
#[tokio::test]
async fn verify_canary_follows_verifier(
    #[case] confirmed: bool,
    #[case] expected: Result<(), CanaryError>,
) {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", false);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries
        .expect_mark_verified()
        .times(usize::from(confirmed))
        .return_once(|_| Ok(true));
    let mut verifier = MockDomainVerifier::new();
    verifier
        .expect_verify()
        .times(1)
        .return_once(move |_, _| Ok(confirmed));

    let outcome = service(
        canaries,
        MockTrustedCanaryRepository::new(),
        verifier,
        MockOneTimePasswordValidator::new(),
    )
    .verify_canary(&domain(), &owner)
    .await;
    assert_eq!(outcome, expected);
}

#[tokio::test]
async fn verify_canary_is_noop_once_verified() {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries.expect_mark_verified().times(0);
    let mut verifier = MockDomainVerifier::new();
    verifier.expect_verify().times(0);

    service(
        canaries,
        MockTrustedCanaryRepository::new(),
        verifier,
        MockOneTimePasswordValidator::new(),
    )
    .verify_canary(&domain(), &owner)
    .await
    .expect("already verified");
}

#[tokio::test]
async fn delete_canary_requires_second_factor() {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries.expect_delete().times(0);
    let mut otp = MockOneTimePasswordValidator::new();
    otp.expect_validate()
        .return_once(|_, _| Err(OneTimePasswordError::invalid()));

    let err = service(
        canaries,
        MockTrustedCanaryRepository::new(),
        MockDomainVerifier::new(),
        otp,
    )
    .delete_canary(&domain(), &owner, "000000")
    .await
    .expect_err("bad otp");
    assert_eq!(err, CanaryError::AuthFactorInvalid);
}

#[tokio::test]
async fn trust_canary_rejects_duplicates() {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_by_domain()
        .return_once(move |_| Ok(Some(canary)));
    let mut trusted = MockTrustedCanaryRepository::new();
    trusted.expect_insert().return_once(|_| Ok(false));

    let err = service(
        canaries,
        trusted,
        MockDomainVerifier::new(),
        MockOneTimePasswordValidator::new(),
    )
    .trust_canary(TrustCanaryRequest {
        domain: domain(),
        public_key_hash: "a1b2c3".to_owned(),
        caller: UserId::random(),
    })
    .await
    .expect_err("duplicate");
    assert_eq!(err, CanaryError::AlreadyTrusted);
}

#[tokio::test]
async fn trust_canary_requires_existing_domain() {
    let mut canaries = MockCanaryRepository::new();
    canaries.expect_find_by_domain().return_once(|_| Ok(None));
    let mut trusted = MockTrustedCanaryRepository::new();
    trusted.expect_insert().times(0);

    let err = service(
        canaries,
        trusted,
        MockDomainVerifier::new(),
        MockOneTimePasswordValidator::new(),
    )
    .trust_canary(TrustCanaryRequest {
        domain: domain(),
        public_key_hash: "a1b2c3".to_owned(),
        caller: UserId::random(),
    })
    .await
    .expect_err("unknown domain");
    assert_eq!(err, CanaryError::CanaryNotFound);
}

#[tokio::test]
async fn public_view_omits_challenge() {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let id = canary.id;
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_by_domain()
        .return_once(move |_| Ok(Some(canary)));

    let public = canaries_only(canaries)
        .get_public_canary(&domain())
        .await
        .expect("found");
    assert_eq!(public.id, id);
    assert!(public.verified);
    let json = serde_json::to_value(&public).expect("serialises");
    assert!(json.get("verification").is_none());
}

#[tokio::test]
async fn update_logo_replaces_and_discards_previous_file() {
    let owner = UserId::random();
    let mut canary = sample_canary(&owner, "example.org", false);
    canary.logo = Some("old.png".to_owned());
    let id = canary.id;
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries
        .expect_set_logo()
        .withf(move |canary_id: &CanaryId, file_ref: &str| {
            *canary_id == id && file_ref == "new.png"
        })
        .times(1)
        .return_once(|_, _| {
            Ok(LogoUpdate::Replaced {
                previous: Some("old.png".to_owned()),
            })
        });
    let mut logos = MockDocumentStorage::new();
    logos.expect_upload().times(1).return_once(stored_logo("new.png"));
    logos
        .expect_remove()
        .withf(|file_ref: &str| file_ref == "old.png")
        .times(1)
        .return_once(|_| Ok(()));

    let updated = logo_service(canaries, logos)
        .update_logo(&domain(), &owner, logo_upload())
        .await
        .expect("logo stored");
    assert_eq!(updated.logo.as_deref(), Some("new.png"));
}

#[tokio::test]
async fn update_logo_of_foreign_canary_uploads_nothing() {
    let mut canaries = MockCanaryRepository::new();
    canaries.expect_find_owned().return_once(|_, _| Ok(None));
    canaries.expect_set_logo().times(0);
    let mut logos = MockDocumentStorage::new();
    logos.expect_upload().times(0);

    let err = logo_service(canaries, logos)
        .update_logo(&domain(), &UserId::random(), logo_upload())
        .await
        .expect_err("not owned");
    assert_eq!(err, CanaryError::CanaryNotFound);
}

#[tokio::test]
async fn update_logo_rejected_by_storage_is_a_validation_error() {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries.expect_set_logo().times(0);
    let mut logos = MockDocumentStorage::new();
    logos
        .expect_upload()
        .return_once(|_| Err(DocumentStorageError::extension_not_allowed("exe")));

    let err = logo_service(canaries, logos)
        .update_logo(&domain(), &owner, logo_upload())
        .await
        .expect_err("bad extension");
    assert_eq!(err.kind(), crate::domain::CanaryErrorKind::Validation);
}

#[rstest]
#[case(Ok(LogoUpdate::Missing), CanaryError::CanaryNotFound)]
#[case(
    Err(CanaryRepositoryError::connection("down")),
    CanaryError::unavailable("down")
)]
#[tokio::test]
async fn update_logo_removes_upload_when_the_write_fails(
    #[case] outcome: Result<LogoUpdate, CanaryRepositoryError>,
    #[case] expected: CanaryError,
) {
    let owner = UserId::random();
    let canary = sample_canary(&owner, "example.org", true);
    let mut canaries = MockCanaryRepository::new();
    canaries
        .expect_find_owned()
        .return_once(move |_, _| Ok(Some(canary)));
    canaries.expect_set_logo().return_once(move |_, _| outcome);
    let mut logos = MockDocumentStorage::new();
    logos.expect_upload().return_once(stored_logo("new.png"));
    logos
        .expect_remove()
        .withf(|file_ref: &str| file_ref == "new.png")
        .times(1)
        .return_once(|_| Ok(()));

    let err = logo_service(canaries, logos)
        .update_logo(&domain(), &owner, logo_upload())
        .await
        .expect_err("write failed");
    assert_eq!(err.kind(), expected.kind());
}
