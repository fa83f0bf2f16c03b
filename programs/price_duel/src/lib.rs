use anchor_lang::prelude::*;
use anchor_spl::token::{self, CloseAccount, Mint, Token, TokenAccount, Transfer};
use pyth_solana_receiver_sdk::price_update::PriceUpdateV2;

pub mod cpi_helpers;
pub mod oracle;

use oracle::{price_change_bps, PriceReading};

declare_id!("5bo6W2rnN9mK8fud6d1pJHmsZ8bpowtQj18SGXG93zvV");

/// Price Duel
/// Two players escrow an equal stake and bet on the direction of a Pyth
/// price feed. The first mover picks Increase or Decrease; the challenger
/// implicitly takes the opposite side. Whoever called the direction of a
/// threshold-sized move claims the whole vault; a timeout without such a
/// move splits it back.

#[program]
pub mod price_duel {
    use super::*;

    /// Initialize the global game configuration
    pub fn initialize(
        ctx: Context<Initialize>,
        entry_amount: u64,
        game_timeout_seconds: u32,
        max_join_movement_bps: u16,
        win_threshold_bps: u16,
        max_price_age_seconds: u32,
        feed_id: [u8; 32],
    ) -> Result<()> {
        require!(entry_amount > 0, GameError::InvalidAmount);
        require!(game_timeout_seconds > 0, GameError::InvalidAmount);
        require!(max_join_movement_bps > 0, GameError::InvalidAmount);
        require!(win_threshold_bps > 0, GameError::InvalidAmount);
        require!(max_price_age_seconds > 0, GameError::InvalidAmount);
        require!(feed_id != [0u8; 32], GameError::InvalidPriceFeed);

        let config = &mut ctx.accounts.config;
        config.authority = ctx.accounts.authority.key();
        config.settlement_mint = ctx.accounts.settlement_mint.key();
        config.feed_id = feed_id;
        config.entry_amount = entry_amount;
        config.game_timeout_seconds = game_timeout_seconds;
        config.max_join_movement_bps = max_join_movement_bps;
        config.win_threshold_bps = win_threshold_bps;
        config.max_price_age_seconds = max_price_age_seconds;
        config.bump = ctx.bumps.config;

        emit!(ConfigInitialized {
            authority: config.authority,
            settlement_mint: config.settlement_mint,
            feed_id,
            entry_amount,
            game_timeout_seconds,
            max_join_movement_bps,
            win_threshold_bps,
            max_price_age_seconds,
        });

        Ok(())
    }

    /// Open a new duel: escrow the entry stake and record the initiator's
    /// prediction together with the verified oracle price at creation.
    pub fn create_game(
        ctx: Context<CreateGame>,
        game_id: u64,
        prediction: PricePrediction,
    ) -> Result<()> {
        let config = &ctx.accounts.config;
        let clock = Clock::get()?;

        let reading = PriceReading::from_update(&ctx.accounts.price_update)?;
        let current = reading.verify(
            &config.feed_id,
            config.max_price_age_seconds,
            clock.unix_timestamp,
        )?;

        // Escrow the initiator's stake into the fresh vault
        let cpi_context = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.initiator_token_account.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
                authority: ctx.accounts.initiator.to_account_info(),
            },
        );
        token::transfer(cpi_context, config.entry_amount)?;

        let game = &mut ctx.accounts.game_state;
        game.game_id = game_id;
        game.initiator = ctx.accounts.initiator.key();
        game.challenger = None;
        game.initiator_prediction = prediction;
        game.winning_prediction = None;
        game.entry_amount = config.entry_amount;
        game.initial_price = current.price;
        game.final_price = None;
        game.created_at = clock.unix_timestamp;
        game.started_at = None;
        game.closed_at = None;
        game.cancelled_at = None;
        game.status = GameStatus::Pending;
        game.bump = ctx.bumps.game_state;

        emit!(GameCreated {
            game_id,
            initiator: game.initiator,
            prediction,
            initial_price: current.price,
            entry_amount: game.entry_amount,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Take the other side of a pending duel. Only allowed while the price
    /// has not drifted more than the configured movement cap since creation,
    /// so neither side joins with an information edge.
    pub fn join_game(ctx: Context<JoinGame>, game_id: u64, initiator: Pubkey) -> Result<()> {
        let config = &ctx.accounts.config;
        let clock = Clock::get()?;

        let reading = PriceReading::from_update(&ctx.accounts.price_update)?;
        let current = reading.verify(
            &config.feed_id,
            config.max_price_age_seconds,
            clock.unix_timestamp,
        )?;

        let change_bps = price_change_bps(current.price, ctx.accounts.game_state.initial_price)?;
        ctx.accounts.game_state.validate_join(
            &ctx.accounts.challenger.key(),
            change_bps,
            config.max_join_movement_bps,
        )?;

        let cpi_context = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.challenger_token_account.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
                authority: ctx.accounts.challenger.to_account_info(),
            },
        );
        token::transfer(cpi_context, ctx.accounts.game_state.entry_amount)?;

        let game = &mut ctx.accounts.game_state;
        game.challenger = Some(ctx.accounts.challenger.key());
        game.started_at = Some(clock.unix_timestamp);
        game.status = GameStatus::Active;

        emit!(GameJoined {
            game_id,
            initiator,
            challenger: ctx.accounts.challenger.key(),
            challenger_prediction: game.challenger_prediction(),
            join_price: current.price,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Settle an active duel once the price has moved at least the win
    /// threshold away from the creation price. The caller must be the
    /// participant on the winning side; they receive the entire vault.
    pub fn close_game(ctx: Context<CloseGame>, game_id: u64, initiator: Pubkey) -> Result<()> {
        let config = &ctx.accounts.config;
        let clock = Clock::get()?;

        let reading = PriceReading::from_update(&ctx.accounts.price_update)?;
        let current = reading.verify(
            &config.feed_id,
            config.max_price_age_seconds,
            clock.unix_timestamp,
        )?;

        let change_bps = price_change_bps(current.price, ctx.accounts.game_state.initial_price)?;
        let winning_prediction = ctx.accounts.game_state.validate_close(
            &ctx.accounts.winner.key(),
            change_bps,
            config.win_threshold_bps,
        )?;

        let payout = ctx.accounts.vault.amount;
        let game_id_bytes = game_id.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            b"game_state",
            initiator.as_ref(),
            &game_id_bytes,
            &[ctx.accounts.game_state.bump],
        ]];

        // Pay the full vault to the winner, then retire the empty vault
        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.winner_token_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::transfer(cpi_context, payout)?;

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            CloseAccount {
                account: ctx.accounts.vault.to_account_info(),
                destination: ctx.accounts.initiator_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::close_account(cpi_context)?;

        let game = &mut ctx.accounts.game_state;
        game.winning_prediction = Some(winning_prediction);
        game.final_price = Some(current.price);
        game.closed_at = Some(clock.unix_timestamp);
        game.status = GameStatus::Complete;

        emit!(GameClosed {
            game_id,
            winner: ctx.accounts.winner.key(),
            winning_prediction,
            final_price: current.price,
            price_change_bps: change_bps,
            payout,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Resolve an active duel as a draw after the timeout has elapsed with
    /// the price still inside the win threshold. Each side gets their stake
    /// back. If the threshold is already met this is rejected; the winner
    /// must settle via `close_game` instead.
    pub fn draw_game(ctx: Context<DrawGame>, game_id: u64, initiator: Pubkey) -> Result<()> {
        let config = &ctx.accounts.config;
        let clock = Clock::get()?;

        let reading = PriceReading::from_update(&ctx.accounts.price_update)?;
        let current = reading.verify(
            &config.feed_id,
            config.max_price_age_seconds,
            clock.unix_timestamp,
        )?;

        let change_bps = price_change_bps(current.price, ctx.accounts.game_state.initial_price)?;
        ctx.accounts.game_state.validate_draw(
            &ctx.accounts.player.key(),
            change_bps,
            config.win_threshold_bps,
            clock.unix_timestamp,
            config.game_timeout_seconds,
        )?;

        let split_amount = ctx.accounts.game_state.entry_amount;
        let game_id_bytes = game_id.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            b"game_state",
            initiator.as_ref(),
            &game_id_bytes,
            &[ctx.accounts.game_state.bump],
        ]];

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.initiator_token_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::transfer(cpi_context, split_amount)?;

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.challenger_token_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::transfer(cpi_context, split_amount)?;

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            CloseAccount {
                account: ctx.accounts.vault.to_account_info(),
                destination: ctx.accounts.initiator_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::close_account(cpi_context)?;

        let game = &mut ctx.accounts.game_state;
        game.closed_at = Some(clock.unix_timestamp);
        game.status = GameStatus::Draw;

        emit!(GameDrawn {
            game_id,
            split_amount,
            final_price: current.price,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Withdraw a pending duel before anyone has joined. Refunds the
    /// initiator's stake and retires the vault.
    pub fn cancel_game(ctx: Context<CancelGame>, game_id: u64) -> Result<()> {
        let clock = Clock::get()?;

        ctx.accounts
            .game_state
            .validate_cancel(&ctx.accounts.initiator.key())?;

        let refund = ctx.accounts.game_state.entry_amount;
        let initiator_key = ctx.accounts.initiator.key();
        let game_id_bytes = game_id.to_le_bytes();
        let signer_seeds: &[&[&[u8]]] = &[&[
            b"game_state",
            initiator_key.as_ref(),
            &game_id_bytes,
            &[ctx.accounts.game_state.bump],
        ]];

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.initiator_token_account.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::transfer(cpi_context, refund)?;

        let cpi_context = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            CloseAccount {
                account: ctx.accounts.vault.to_account_info(),
                destination: ctx.accounts.initiator.to_account_info(),
                authority: ctx.accounts.game_state.to_account_info(),
            },
            signer_seeds,
        );
        token::close_account(cpi_context)?;

        let game = &mut ctx.accounts.game_state;
        game.cancelled_at = Some(clock.unix_timestamp);
        game.status = GameStatus::Cancelled;

        emit!(GameCancelled {
            game_id,
            refund,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Verify and return the current oracle price without touching any game.
    /// Clients use this for display; the settlement instructions run the
    /// same verification internally.
    pub fn fetch_price(ctx: Context<FetchPrice>) -> Result<u64> {
        let config = &ctx.accounts.config;
        let clock = Clock::get()?;

        let reading = PriceReading::from_update(&ctx.accounts.price_update)?;
        let current = reading.verify(
            &config.feed_id,
            config.max_price_age_seconds,
            clock.unix_timestamp,
        )?;

        emit!(PriceFetched {
            feed_id: config.feed_id,
            price: current.price,
            conf: current.conf,
            publish_time: reading.publish_time,
            timestamp: clock.unix_timestamp,
        });

        Ok(current.price)
    }
}

// === Account Structures ===

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = authority,
        space = 8 + GameConfig::INIT_SPACE,
        seeds = [b"config"],
        bump
    )]
    pub config: Account<'info, GameConfig>,

    pub settlement_mint: Account<'info, Mint>,

    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(game_id: u64)]
pub struct CreateGame<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    #[account(mut)]
    pub initiator: Signer<'info>,

    #[account(
        mut,
        constraint = initiator_token_account.owner == initiator.key() @ GameError::InvalidTokenAccount,
        constraint = initiator_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub initiator_token_account: Account<'info, TokenAccount>,

    #[account(address = config.settlement_mint @ GameError::InvalidTokenMint)]
    pub settlement_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = initiator,
        token::mint = settlement_mint,
        token::authority = game_state,
        seeds = [b"game_vault", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        init,
        payer = initiator,
        space = 8 + GameState::INIT_SPACE,
        seeds = [b"game_state", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub game_state: Account<'info, GameState>,

    pub price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(game_id: u64, initiator: Pubkey)]
pub struct JoinGame<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    #[account(mut)]
    pub challenger: Signer<'info>,

    #[account(
        mut,
        constraint = challenger_token_account.owner == challenger.key() @ GameError::InvalidTokenAccount,
        constraint = challenger_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub challenger_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = vault.mint == config.settlement_mint @ GameError::InvalidTokenMint,
        seeds = [b"game_vault", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_state", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump = game_state.bump
    )]
    pub game_state: Account<'info, GameState>,

    pub price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(game_id: u64, initiator: Pubkey)]
pub struct CloseGame<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    #[account(mut)]
    pub winner: Signer<'info>,

    #[account(
        mut,
        constraint = winner_token_account.owner == winner.key() @ GameError::InvalidTokenAccount,
        constraint = winner_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub winner_token_account: Account<'info, TokenAccount>,

    /// CHECK: Rent destination for the closed vault, must be the initiator
    #[account(mut, address = game_state.initiator @ GameError::IncorrectInitiator)]
    pub initiator_account: AccountInfo<'info>,

    #[account(
        mut,
        seeds = [b"game_vault", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_state", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump = game_state.bump
    )]
    pub game_state: Account<'info, GameState>,

    pub price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(game_id: u64, initiator: Pubkey)]
pub struct DrawGame<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    #[account(mut)]
    pub player: Signer<'info>,

    /// CHECK: Rent destination for the closed vault, must be the initiator
    #[account(mut, address = game_state.initiator @ GameError::IncorrectInitiator)]
    pub initiator_account: AccountInfo<'info>,

    #[account(
        mut,
        constraint = initiator_token_account.owner == game_state.initiator @ GameError::InvalidTokenAccount,
        constraint = initiator_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub initiator_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = game_state.challenger == Some(challenger_token_account.owner) @ GameError::InvalidTokenAccount,
        constraint = challenger_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub challenger_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_vault", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_state", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump = game_state.bump
    )]
    pub game_state: Account<'info, GameState>,

    pub price_update: Account<'info, PriceUpdateV2>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(game_id: u64)]
pub struct CancelGame<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    #[account(mut)]
    pub initiator: Signer<'info>,

    #[account(
        mut,
        constraint = initiator_token_account.owner == initiator.key() @ GameError::InvalidTokenAccount,
        constraint = initiator_token_account.mint == config.settlement_mint @ GameError::InvalidTokenMint,
    )]
    pub initiator_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_vault", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"game_state", initiator.key().as_ref(), &game_id.to_le_bytes()],
        bump = game_state.bump
    )]
    pub game_state: Account<'info, GameState>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct FetchPrice<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,

    pub price_update: Account<'info, PriceUpdateV2>,
}

// === State Accounts ===

#[account]
#[derive(InitSpace)]
pub struct GameConfig {
    pub authority: Pubkey,
    pub settlement_mint: Pubkey,
    pub feed_id: [u8; 32],
    pub entry_amount: u64,
    pub game_timeout_seconds: u32,
    pub max_join_movement_bps: u16,
    pub win_threshold_bps: u16,
    pub max_price_age_seconds: u32,
    pub bump: u8,
}

#[account]
#[derive(InitSpace)]
pub struct GameState {
    pub game_id: u64,
    pub initiator: Pubkey,
    pub challenger: Option<Pubkey>,
    pub initiator_prediction: PricePrediction,
    pub winning_prediction: Option<PricePrediction>,
    pub entry_amount: u64,
    pub initial_price: u64,
    pub final_price: Option<u64>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub closed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub status: GameStatus,
    pub bump: u8,
}

impl GameState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            GameStatus::Complete | GameStatus::Draw | GameStatus::Cancelled
        )
    }

    pub fn is_player(&self, key: &Pubkey) -> bool {
        *key == self.initiator || self.challenger == Some(*key)
    }

    /// The challenger always holds the opposite side; only the initiator's
    /// prediction is persisted.
    pub fn challenger_prediction(&self) -> PricePrediction {
        match self.initiator_prediction {
            PricePrediction::Increase => PricePrediction::Decrease,
            PricePrediction::Decrease => PricePrediction::Increase,
        }
    }

    /// The participant holding the given prediction.
    pub fn party_with(&self, prediction: PricePrediction) -> Result<Pubkey> {
        if prediction == self.initiator_prediction {
            Ok(self.initiator)
        } else {
            self.challenger.ok_or(GameError::GameNotActive.into())
        }
    }

    pub fn validate_join(
        &self,
        challenger: &Pubkey,
        change_bps: i64,
        max_join_movement_bps: u16,
    ) -> Result<()> {
        require!(!self.is_terminal(), GameError::GameAlreadyEnded);
        require!(
            self.status == GameStatus::Pending,
            GameError::GameAlreadyFull
        );
        require!(
            *challenger != self.initiator,
            GameError::CannotJoinOwnGame
        );
        require!(
            change_bps.unsigned_abs() <= max_join_movement_bps as u64,
            GameError::ExcessivePriceVolatility
        );
        Ok(())
    }

    /// Checks every close precondition and returns the winning prediction.
    /// The threshold comparison is inclusive: a move of exactly
    /// `win_threshold_bps` settles the game.
    pub fn validate_close(
        &self,
        caller: &Pubkey,
        change_bps: i64,
        win_threshold_bps: u16,
    ) -> Result<PricePrediction> {
        require!(!self.is_terminal(), GameError::GameAlreadyEnded);
        require!(self.status == GameStatus::Active, GameError::GameNotActive);
        require!(self.is_player(caller), GameError::NotAuthorized);
        require!(
            change_bps.unsigned_abs() >= win_threshold_bps as u64,
            GameError::ThresholdNotReached
        );

        let winning_prediction = if change_bps > 0 {
            PricePrediction::Increase
        } else {
            PricePrediction::Decrease
        };
        let winner = self.party_with(winning_prediction)?;
        require_keys_eq!(*caller, winner, GameError::NotTheWinner);

        Ok(winning_prediction)
    }

    /// A draw is only reachable once the timeout has elapsed and the win
    /// threshold is still unmet; a threshold-sized move forces `close`.
    pub fn validate_draw(
        &self,
        caller: &Pubkey,
        change_bps: i64,
        win_threshold_bps: u16,
        now: i64,
        game_timeout_seconds: u32,
    ) -> Result<()> {
        require!(!self.is_terminal(), GameError::GameAlreadyEnded);
        require!(self.status == GameStatus::Active, GameError::GameNotActive);
        require!(self.is_player(caller), GameError::NotAuthorized);
        require!(
            change_bps.unsigned_abs() < win_threshold_bps as u64,
            GameError::ThresholdAlreadyReached
        );

        let started_at = self.started_at.ok_or(GameError::GameNotActive)?;
        let deadline = started_at
            .checked_add(game_timeout_seconds as i64)
            .ok_or(GameError::MathOverflow)?;
        require!(now >= deadline, GameError::TimeoutNotReached);

        Ok(())
    }

    pub fn validate_cancel(&self, caller: &Pubkey) -> Result<()> {
        require!(!self.is_terminal(), GameError::GameAlreadyEnded);
        require_keys_eq!(*caller, self.initiator, GameError::NotInitiator);
        require!(
            self.status == GameStatus::Pending,
            GameError::WithdrawalBlocked
        );
        Ok(())
    }
}

// === Types ===

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, InitSpace)]
pub enum PricePrediction {
    Increase,
    Decrease,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug, InitSpace)]
pub enum GameStatus {
    Pending,
    Active,
    Complete,
    Draw,
    Cancelled,
}

// === Events ===

#[event]
pub struct ConfigInitialized {
    pub authority: Pubkey,
    pub settlement_mint: Pubkey,
    pub feed_id: [u8; 32],
    pub entry_amount: u64,
    pub game_timeout_seconds: u32,
    pub max_join_movement_bps: u16,
    pub win_threshold_bps: u16,
    pub max_price_age_seconds: u32,
}

#[event]
pub struct GameCreated {
    pub game_id: u64,
    pub initiator: Pubkey,
    pub prediction: PricePrediction,
    pub initial_price: u64,
    pub entry_amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct GameJoined {
    pub game_id: u64,
    pub initiator: Pubkey,
    pub challenger: Pubkey,
    pub challenger_prediction: PricePrediction,
    pub join_price: u64,
    pub timestamp: i64,
}

#[event]
pub struct GameClosed {
    pub game_id: u64,
    pub winner: Pubkey,
    pub winning_prediction: PricePrediction,
    pub final_price: u64,
    pub price_change_bps: i64,
    pub payout: u64,
    pub timestamp: i64,
}

#[event]
pub struct GameDrawn {
    pub game_id: u64,
    pub split_amount: u64,
    pub final_price: u64,
    pub timestamp: i64,
}

#[event]
pub struct GameCancelled {
    pub game_id: u64,
    pub refund: u64,
    pub timestamp: i64,
}

#[event]
pub struct PriceFetched {
    pub feed_id: [u8; 32],
    pub price: u64,
    pub conf: u64,
    pub publish_time: i64,
    pub timestamp: i64,
}

// === Errors ===

#[error_code]
pub enum GameError {
    #[msg("Invalid price feed")]
    InvalidPriceFeed,
    #[msg("The price feed data is stale")]
    StalePriceFeed,
    #[msg("Invalid price value received from oracle")]
    InvalidPriceValue,
    #[msg("Price feeds with a positive exponent are not supported")]
    UnsupportedPositiveExponent,
    #[msg("Price update is not fully verified")]
    UnverifiedPriceUpdate,
    #[msg("Arithmetic overflow")]
    MathOverflow,
    #[msg("Invalid amount")]
    InvalidAmount,
    #[msg("Invalid token account")]
    InvalidTokenAccount,
    #[msg("Token account mint does not match the settlement mint")]
    InvalidTokenMint,
    #[msg("Cannot join your own game")]
    CannotJoinOwnGame,
    #[msg("This game already has two players")]
    GameAlreadyFull,
    #[msg("This game has already been completed or cancelled")]
    GameAlreadyEnded,
    #[msg("Game is not active")]
    GameNotActive,
    #[msg("Caller is not a participant of the game")]
    NotAuthorized,
    #[msg("Only the initiator can withdraw from this game")]
    NotInitiator,
    #[msg("Only the winner can close the game")]
    NotTheWinner,
    #[msg("Incorrect initiator address provided")]
    IncorrectInitiator,
    #[msg("Withdrawal not allowed after a challenger has joined")]
    WithdrawalBlocked,
    #[msg("Cannot join - price has moved too much since creation")]
    ExcessivePriceVolatility,
    #[msg("Price threshold has not been reached yet")]
    ThresholdNotReached,
    #[msg("Price threshold already met - settle with close_game")]
    ThresholdAlreadyReached,
    #[msg("Game timeout has not elapsed yet")]
    TimeoutNotReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: u32 = 1800;
    const MAX_JOIN_BPS: u16 = 100;
    const WIN_BPS: u16 = 500;

    fn pending_game(initiator: Pubkey) -> GameState {
        GameState {
            game_id: 1,
            initiator,
            challenger: None,
            initiator_prediction: PricePrediction::Increase,
            winning_prediction: None,
            entry_amount: 1_000_000_000,
            initial_price: 1_800_000_000,
            final_price: None,
            created_at: 1_000,
            started_at: None,
            closed_at: None,
            cancelled_at: None,
            status: GameStatus::Pending,
            bump: 255,
        }
    }

    fn active_game(initiator: Pubkey, challenger: Pubkey) -> GameState {
        let mut game = pending_game(initiator);
        game.challenger = Some(challenger);
        game.started_at = Some(2_000);
        game.status = GameStatus::Active;
        game
    }

    #[test]
    fn challenger_takes_the_opposite_side() {
        let mut game = pending_game(Pubkey::new_unique());
        assert_eq!(game.challenger_prediction(), PricePrediction::Decrease);

        game.initiator_prediction = PricePrediction::Decrease;
        assert_eq!(game.challenger_prediction(), PricePrediction::Increase);
    }

    #[test]
    fn join_rejects_own_game() {
        let initiator = Pubkey::new_unique();
        let game = pending_game(initiator);
        assert_eq!(
            game.validate_join(&initiator, 0, MAX_JOIN_BPS).unwrap_err(),
            GameError::CannotJoinOwnGame.into()
        );
    }

    #[test]
    fn join_movement_boundary_is_inclusive() {
        let game = pending_game(Pubkey::new_unique());
        let challenger = Pubkey::new_unique();

        assert!(game.validate_join(&challenger, 100, MAX_JOIN_BPS).is_ok());
        assert!(game.validate_join(&challenger, -100, MAX_JOIN_BPS).is_ok());
        assert_eq!(
            game.validate_join(&challenger, 101, MAX_JOIN_BPS).unwrap_err(),
            GameError::ExcessivePriceVolatility.into()
        );
    }

    #[test]
    fn join_rejects_full_or_ended_games() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();
        let third = Pubkey::new_unique();

        let active = active_game(initiator, challenger);
        assert_eq!(
            active.validate_join(&third, 0, MAX_JOIN_BPS).unwrap_err(),
            GameError::GameAlreadyFull.into()
        );

        let mut cancelled = pending_game(initiator);
        cancelled.status = GameStatus::Cancelled;
        cancelled.cancelled_at = Some(3_000);
        assert_eq!(
            cancelled.validate_join(&third, 0, MAX_JOIN_BPS).unwrap_err(),
            GameError::GameAlreadyEnded.into()
        );
    }

    #[test]
    fn close_threshold_boundary_is_inclusive() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();
        let game = active_game(initiator, challenger);

        // Exactly the threshold, upward: initiator (Increase) wins.
        assert_eq!(
            game.validate_close(&initiator, 500, WIN_BPS).unwrap(),
            PricePrediction::Increase
        );

        assert_eq!(
            game.validate_close(&initiator, 499, WIN_BPS).unwrap_err(),
            GameError::ThresholdNotReached.into()
        );
    }

    #[test]
    fn close_pays_the_side_that_called_the_move() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();
        let game = active_game(initiator, challenger);

        // Price fell: challenger holds Decrease and is the winner.
        assert_eq!(
            game.validate_close(&challenger, -500, WIN_BPS).unwrap(),
            PricePrediction::Decrease
        );
        assert_eq!(game.party_with(PricePrediction::Decrease).unwrap(), challenger);

        // The losing side cannot claim.
        assert_eq!(
            game.validate_close(&initiator, -500, WIN_BPS).unwrap_err(),
            GameError::NotTheWinner.into()
        );
    }

    #[test]
    fn close_rejects_outsiders_and_wrong_states() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();
        let outsider = Pubkey::new_unique();

        let game = active_game(initiator, challenger);
        assert_eq!(
            game.validate_close(&outsider, 500, WIN_BPS).unwrap_err(),
            GameError::NotAuthorized.into()
        );

        let pending = pending_game(initiator);
        assert_eq!(
            pending.validate_close(&initiator, 500, WIN_BPS).unwrap_err(),
            GameError::GameNotActive.into()
        );

        let mut complete = active_game(initiator, challenger);
        complete.status = GameStatus::Complete;
        complete.closed_at = Some(4_000);
        assert_eq!(
            complete.validate_close(&initiator, 500, WIN_BPS).unwrap_err(),
            GameError::GameAlreadyEnded.into()
        );
    }

    #[test]
    fn draw_requires_elapsed_timeout() {
        let initiator = Pubkey::new_unique();
        let game = active_game(initiator, Pubkey::new_unique());
        let deadline = game.started_at.unwrap() + TIMEOUT as i64;

        assert_eq!(
            game.validate_draw(&initiator, 0, WIN_BPS, deadline - 1, TIMEOUT)
                .unwrap_err(),
            GameError::TimeoutNotReached.into()
        );
        // Elapsed time exactly equal to the timeout is enough.
        assert!(game
            .validate_draw(&initiator, 0, WIN_BPS, deadline, TIMEOUT)
            .is_ok());
    }

    #[test]
    fn draw_rejected_once_threshold_is_met() {
        let initiator = Pubkey::new_unique();
        let game = active_game(initiator, Pubkey::new_unique());
        let late = game.started_at.unwrap() + TIMEOUT as i64 + 60;

        assert_eq!(
            game.validate_draw(&initiator, 500, WIN_BPS, late, TIMEOUT)
                .unwrap_err(),
            GameError::ThresholdAlreadyReached.into()
        );
        assert_eq!(
            game.validate_draw(&initiator, -500, WIN_BPS, late, TIMEOUT)
                .unwrap_err(),
            GameError::ThresholdAlreadyReached.into()
        );
        assert!(game
            .validate_draw(&initiator, 499, WIN_BPS, late, TIMEOUT)
            .is_ok());
    }

    #[test]
    fn cancel_only_while_pending_and_only_by_initiator() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();

        let pending = pending_game(initiator);
        assert!(pending.validate_cancel(&initiator).is_ok());
        assert_eq!(
            pending.validate_cancel(&challenger).unwrap_err(),
            GameError::NotInitiator.into()
        );

        let active = active_game(initiator, challenger);
        assert_eq!(
            active.validate_cancel(&initiator).unwrap_err(),
            GameError::WithdrawalBlocked.into()
        );

        let mut done = active_game(initiator, challenger);
        done.status = GameStatus::Draw;
        done.closed_at = Some(4_000);
        assert_eq!(
            done.validate_cancel(&initiator).unwrap_err(),
            GameError::GameAlreadyEnded.into()
        );
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        let initiator = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();
        let third = Pubkey::new_unique();

        for status in [GameStatus::Complete, GameStatus::Draw, GameStatus::Cancelled] {
            let mut game = active_game(initiator, challenger);
            game.status = status;

            let ended: anchor_lang::error::Error = GameError::GameAlreadyEnded.into();
            assert_eq!(
                game.validate_join(&third, 0, MAX_JOIN_BPS).unwrap_err(),
                ended
            );
            assert_eq!(
                game.validate_close(&initiator, 500, WIN_BPS).unwrap_err(),
                GameError::GameAlreadyEnded.into()
            );
            assert_eq!(
                game.validate_draw(&initiator, 0, WIN_BPS, 10_000, TIMEOUT)
                    .unwrap_err(),
                GameError::GameAlreadyEnded.into()
            );
            assert_eq!(
                game.validate_cancel(&initiator).unwrap_err(),
                GameError::GameAlreadyEnded.into()
            );
        }
    }
}
