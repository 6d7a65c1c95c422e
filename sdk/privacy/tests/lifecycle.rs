mod common;

use std::sync::Arc;

use common::{MockLedger, fe};
use zklend_privacy::{
    Action, Address, HashSuite, KeccakHasher, Note, NullifierSet, Operation, PackedKeccakHasher,
    PositionUpdate, PrivacyError, os_entropy,
};

fn poseidon_ledger() -> MockLedger {
    MockLedger::new(6, HashSuite::poseidon())
}

fn payout() -> Address {
    "0x00000000000000000000000000000000000000aa".parse().unwrap()
}

#[test]
fn full_position_lifecycle() {
    let mut ledger = poseidon_ledger();
    let assembler = ledger.assembler();
    let scheme = assembler.scheme().clone();
    let mut rng = os_entropy();

    // open
    let t = assembler
        .assemble(
            &Note::zero(),
            PositionUpdate::new(Action::Deposit(1000), fe(2500), fe(1)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    assert_eq!(t.operation, Operation::Create);
    assert_eq!(t.old_nullifier_hash, scheme.sentinel_nullifier_hash().unwrap());
    ledger.submit(&t).unwrap();
    let mut note = t.new_note;

    // someone else's position lands in between
    let other = assembler
        .assemble(
            &Note::zero(),
            PositionUpdate::new(Action::Deposit(5), fe(1), fe(1)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    ledger.submit(&other).unwrap();

    let steps = [
        (Action::Deposit(500), None, 1500, 0),
        (Action::Borrow(300), Some(payout()), 1500, 300),
        (Action::Repay(300), None, 1500, 0),
        (Action::Withdraw(1500), Some(payout()), 0, 0),
    ];

    for (i, (action, to, lend, borrow)) in steps.into_iter().enumerate() {
        let t = assembler
            .assemble(
                &note,
                PositionUpdate::new(action, fe(2500), fe(i as u64 + 2))
                    .with_recipient(to),
                &ledger.snapshot(),
                &mut rng,
            )
            .unwrap();

        assert_eq!(t.old_nullifier_hash, note.nullifier_hash(&scheme).unwrap());
        assert_eq!(t.new_note.lend_amt, fe(lend));
        assert_eq!(t.new_note.borrow_amt, fe(borrow));
        assert_ne!(t.new_note.nullifier, note.nullifier);

        ledger.submit(&t).unwrap();
        note = t.new_note;
    }

    assert_eq!(ledger.leaves.len(), 6);
    assert_eq!(ledger.nullifiers.spent_count(), 4);
}

#[test]
fn spent_note_cannot_be_submitted_twice() {
    let mut ledger = poseidon_ledger();
    let assembler = ledger.assembler();
    let mut rng = os_entropy();

    let open = assembler
        .assemble(
            &Note::zero(),
            PositionUpdate::new(Action::Deposit(100), fe(1), fe(1)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    ledger.submit(&open).unwrap();

    let first = assembler
        .assemble(
            &open.new_note,
            PositionUpdate::new(Action::Deposit(1), fe(1), fe(2)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    let second = assembler
        .assemble(
            &open.new_note,
            PositionUpdate::new(Action::Deposit(2), fe(1), fe(2)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();

    ledger.submit(&first).unwrap();
    assert!(ledger.submit(&second).is_err());
}

#[test]
fn single_in_flight_reservation() {
    let ledger = poseidon_ledger();
    let assembler = ledger.assembler();
    let mut rng = os_entropy();
    let note = Note::create(fe(10), fe(0), fe(1), fe(1), &mut rng).unwrap();
    let hash = note.nullifier_hash(assembler.scheme()).unwrap();

    let mut in_flight = NullifierSet::new();
    in_flight.reserve(hash, &ledger.sentinel).unwrap();
    assert!(in_flight.reserve(hash, &ledger.sentinel).is_err());

    in_flight.release(&hash);
    in_flight.reserve(hash, &ledger.sentinel).unwrap();
}

#[test]
fn bundle_goes_stale_after_root_history_rolls_over() {
    let mut ledger = poseidon_ledger();
    let assembler = ledger.assembler();
    let mut rng = os_entropy();

    let open = assembler
        .assemble(
            &Note::zero(),
            PositionUpdate::new(Action::Deposit(100), fe(1), fe(1)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    ledger.submit(&open).unwrap();

    let pending = assembler
        .assemble(
            &open.new_note,
            PositionUpdate::new(Action::Deposit(1), fe(1), fe(2)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();

    for _ in 0..30 {
        let filler = assembler
            .assemble(
                &Note::zero(),
                PositionUpdate::new(Action::Deposit(1), fe(1), fe(1)),
                &ledger.snapshot(),
                &mut rng,
            )
            .unwrap();
        ledger.submit(&filler).unwrap();
    }

    let err = pending.ensure_current(&ledger.roots).unwrap_err();
    assert!(matches!(err, PrivacyError::StaleRoot { .. }));
    assert!(ledger.submit(&pending).is_err());

    // rebuilding against a fresh snapshot recovers
    let retry = assembler
        .assemble(
            &open.new_note,
            PositionUpdate::new(Action::Deposit(1), fe(1), fe(2)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    ledger.submit(&retry).unwrap();
}

#[test]
fn positions_assemble_concurrently_from_one_snapshot() {
    let mut ledger = poseidon_ledger();
    let assembler = ledger.assembler();
    let mut rng = os_entropy();

    let notes: Vec<Note> = (0..4)
        .map(|i| {
            let t = assembler
                .assemble(
                    &Note::zero(),
                    PositionUpdate::new(Action::Deposit(100 + i), fe(1), fe(1)),
                    &ledger.snapshot(),
                    &mut rng,
                )
                .unwrap();
            ledger.submit(&t).unwrap();
            t.new_note
        })
        .collect();

    let snapshot = ledger.snapshot();
    let transitions: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = notes
            .iter()
            .map(|note| {
                let assembler = &assembler;
                let snapshot = &snapshot;
                s.spawn(move || {
                    assembler
                        .assemble(
                            note,
                            PositionUpdate::new(Action::Deposit(1), fe(1), fe(2)),
                            snapshot,
                            &mut os_entropy(),
                        )
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (t, note) in transitions.iter().zip(&notes) {
        assert_eq!(t.root(), snapshot.root());
        assert_eq!(t.new_note.lend_amt.to_biguint(), note.lend_amt.to_biguint() + 1u8);
    }
}

#[test]
fn keccak_suite_runs_end_to_end() {
    let suite = HashSuite::new(Arc::new(PackedKeccakHasher), Arc::new(KeccakHasher));
    let mut ledger = MockLedger::new(4, suite);
    let assembler = ledger.assembler();
    let mut rng = os_entropy();

    let open = assembler
        .assemble(
            &Note::zero(),
            PositionUpdate::new(Action::Deposit(42), fe(1), fe(1)),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    ledger.submit(&open).unwrap();

    let next = assembler
        .assemble(
            &open.new_note,
            PositionUpdate::new(Action::Borrow(7), fe(1), fe(2))
                .with_recipient(Some(payout())),
            &ledger.snapshot(),
            &mut rng,
        )
        .unwrap();
    assert_eq!(next.bundle.public.recipient, payout().to_field());
    ledger.submit(&next).unwrap();
}
