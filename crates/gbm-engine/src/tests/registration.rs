use {
    super::*,
    crate::domain::{auction::State, engine::Batch, preset::Preset},
};

#[test]
fn locks_the_token_and_records_the_auction() {
    let setup = Setup::new();
    let id = setup.register(7);

    assert_eq!(setup.realm_holder(7), Some(OPERATOR));
    assert_eq!(setup.engine.auction_id(ERC721, TokenId::from(7)), Some(id));
    assert_eq!(setup.engine.auction_state(id).unwrap(), State::Open);

    let auction = setup.engine.auction(id).unwrap();
    assert_eq!(auction.owner, OWNER);
    assert_eq!(auction.token_contract, REALMS);
    assert_eq!(auction.preset, medium());
    assert_eq!(auction.end_time, medium().end_time);
    assert_eq!(auction.highest_bidder, None);
    assert_eq!(auction.highest_bid, U256::ZERO);
    assert_eq!(setup.engine.minimum_bid(id).unwrap(), U256::from(10_000));
    assert_eq!(setup.engine.due_incentive(id).unwrap(), U256::ZERO);

    assert_eq!(
        setup.events.take(),
        vec![Event::AuctionRegistered {
            auction: id,
            contract: ERC721,
            token: TokenId::from(7),
            kind: TokenKind::Erc721,
            amount: U256::from(1),
            preset: MEDIUM,
            owner: OWNER,
        }]
    );
}

#[test]
fn ids_are_only_consumed_by_successful_registrations() {
    let setup = Setup::new();
    assert_eq!(setup.register(1), auction::Id(1));

    // Realm 42 was never minted.
    assert!(matches!(
        setup.engine.register(
            Registration {
                contract: ERC721,
                token: TokenId::from(42),
                kind: TokenKind::Erc721,
                amount: U256::from(1),
                preset: MEDIUM,
            },
            OWNER,
        ),
        Err(Error::TokenNotOwned { .. })
    ));
    assert_eq!(setup.register(2), auction::Id(2));
}

#[test]
fn duplicates_are_rejected_until_settled() {
    let setup = Setup::new();
    let first = setup.register(7);

    // The token sits with the operator now, but the duplicate is reported
    // before ownership is checked.
    assert!(matches!(
        setup.engine.register(
            Registration {
                contract: ERC721,
                token: TokenId::from(7),
                kind: TokenKind::Erc721,
                amount: U256::from(1),
                preset: MEDIUM,
            },
            OWNER,
        ),
        Err(Error::DuplicateAuction { existing, .. }) if existing == first
    ));

    setup.engine.cancel_auction(first, OWNER).unwrap();
    assert_eq!(setup.engine.auction_id(ERC721, TokenId::from(7)), None);
    let second = setup.register(7);
    assert_ne!(first, second);

    setup.bid(second, ALICE, ghst(1)).unwrap();
    setup.clock.set(medium().end_time);
    setup.engine.claim(second, ALICE).unwrap();
    assert_eq!(setup.realm_holder(7), Some(ALICE));

    // Alice could put the realm up again once she approved the operator.
    setup
        .ledger
        .set_approval_for_all(REALMS, ALICE, OPERATOR, true);
    let third = setup
        .engine
        .register(
            Registration {
                contract: ERC721,
                token: TokenId::from(7),
                kind: TokenKind::Erc721,
                amount: U256::from(1),
                preset: MEDIUM,
            },
            ALICE,
        )
        .unwrap();
    assert_eq!(setup.engine.auction(third).unwrap().owner, ALICE);
}

#[test]
fn requires_approval() {
    let setup = Setup::new();
    setup
        .ledger
        .set_approval_for_all(REALMS, OWNER, OPERATOR, false);
    assert!(matches!(
        setup.engine.register(
            Registration {
                contract: ERC721,
                token: TokenId::from(7),
                kind: TokenKind::Erc721,
                amount: U256::from(1),
                preset: MEDIUM,
            },
            OWNER,
        ),
        Err(Error::TokenNotApproved { owner, .. }) if owner == OWNER
    ));
    assert_eq!(setup.realm_holder(7), Some(OWNER));
}

#[test]
fn erc1155_lots() {
    let setup = Setup::new();
    let lot = |amount: u64| Registration {
        contract: ERC1155,
        token: TokenId::from(1),
        kind: TokenKind::Erc1155,
        amount: U256::from(amount),
        preset: MEDIUM,
    };

    assert!(matches!(
        setup.engine.register(lot(0), OWNER),
        Err(Error::InvalidTokenAmount { .. })
    ));
    assert!(matches!(
        setup.engine.register(lot(11), OWNER),
        Err(Error::TokenNotOwned { .. })
    ));

    let id = setup.engine.register(lot(4), OWNER).unwrap();
    assert_eq!(setup.engine.auction(id).unwrap().amount, U256::from(4));
    assert_eq!(
        setup
            .ledger
            .token_balance_of(WEARABLES, TokenId::from(1), OWNER),
        U256::from(6)
    );
    assert_eq!(
        setup
            .ledger
            .token_balance_of(WEARABLES, TokenId::from(1), OPERATOR),
        U256::from(4)
    );
}

#[test]
fn registers_many_independently() {
    let setup = Setup::new();
    let existing = setup.register(2);

    let results = setup.engine.register_many(
        &Batch {
            contract: ERC721,
            tokens: [1, 2, 42, 3].into_iter().map(TokenId::from).collect(),
            kind: TokenKind::Erc721,
            amount: U256::from(1),
            preset: MEDIUM,
        },
        OWNER,
    );

    assert_eq!(results.len(), 4);
    assert!(matches!(results[0], Ok(auction::Id(2))));
    assert!(matches!(
        results[1],
        Err(Error::DuplicateAuction { existing: found, .. }) if found == existing
    ));
    assert!(matches!(results[2], Err(Error::TokenNotOwned { .. })));
    assert!(matches!(results[3], Ok(auction::Id(3))));
    assert_eq!(setup.realm_holder(3), Some(OPERATOR));
}

#[test]
fn contract_must_allow_bidding() {
    let setup = Setup::new();
    setup
        .engine
        .set_bidding_allowed(ADMIN, ERC721, false)
        .unwrap();
    assert!(matches!(
        setup.engine.register(
            Registration {
                contract: ERC721,
                token: TokenId::from(7),
                kind: TokenKind::Erc721,
                amount: U256::from(1),
                preset: MEDIUM,
            },
            OWNER,
        ),
        Err(Error::ContractBiddingDisabled(ERC721))
    ));

    // Newly registered contracts start out disabled.
    setup
        .engine
        .register_contract(ADMIN, contract::Id(1), Address::repeat_byte(0x99))
        .unwrap();
    assert!(!setup.engine.contract(contract::Id(1)).unwrap().bidding_allowed);
}

#[test]
fn auctions_keep_their_preset() {
    let setup = Setup::new();
    let id = setup.register(7);

    let longer = Preset {
        end_time: 200_000,
        ..medium()
    };
    setup.engine.set_preset(ADMIN, MEDIUM, longer).unwrap();
    assert_eq!(setup.engine.preset(MEDIUM).unwrap(), longer);

    assert_eq!(setup.engine.auction(id).unwrap().end_time, medium().end_time);
    let later = setup.register(8);
    assert_eq!(setup.engine.auction(later).unwrap().end_time, 200_000);
}

#[test]
fn slow_registration_does_not_hold_up_other_auctions() {
    let setup = Setup::new();
    let open = setup.register(1);
    let stall = setup.ledger.stall_next_token_lookup();

    std::thread::scope(|scope| {
        let registering = scope.spawn(|| setup.register(2));
        stall.entered.recv().unwrap();

        // Realm 2 is still being checked against the ledger.
        let receipt = setup.bid(open, ALICE, ghst(1)).unwrap();
        assert_eq!(receipt.auction, open);
        assert_eq!(setup.engine.auction_id(ERC721, TokenId::from(2)), None);

        stall.release.send(()).unwrap();
        assert_eq!(registering.join().unwrap(), auction::Id(2));
    });
    assert_eq!(setup.realm_holder(2), Some(OPERATOR));
}
