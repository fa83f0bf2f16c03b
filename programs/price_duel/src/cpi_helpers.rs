//! CPI (Cross-Program Invocation) helpers for Price Duel
//!
//! This module provides helper functions for other Solana programs to call
//! Price Duel instructions via CPI, plus the PDA derivations clients use to
//! locate a game's record and vault without any on-chain registry.
//!
//! # Example
//!
//! ```ignore
//! use price_duel::cpi;
//! use price_duel::cpi::accounts::CreateGame;
//!
//! // In your program's instruction handler:
//! let cpi_accounts = CreateGame {
//!     config: ctx.accounts.config.to_account_info(),
//!     initiator: ctx.accounts.initiator.to_account_info(),
//!     initiator_token_account: ctx.accounts.initiator_token_account.to_account_info(),
//!     settlement_mint: ctx.accounts.settlement_mint.to_account_info(),
//!     vault: ctx.accounts.vault.to_account_info(),
//!     game_state: ctx.accounts.game_state.to_account_info(),
//!     price_update: ctx.accounts.price_update.to_account_info(),
//!     token_program: ctx.accounts.token_program.to_account_info(),
//!     system_program: ctx.accounts.system_program.to_account_info(),
//! };
//!
//! let cpi_ctx = CpiContext::new(ctx.accounts.duel_program.to_account_info(), cpi_accounts);
//! price_duel::cpi::create_game(cpi_ctx, game_id, prediction)?;
//! ```

use anchor_lang::prelude::*;

/// Account struct for CPI create game calls
#[derive(Accounts)]
pub struct CpiCreateGame<'info> {
    /// CHECK: Config account (validated by the duel program)
    pub config: AccountInfo<'info>,
    /// CHECK: Initiator/signer
    pub initiator: AccountInfo<'info>,
    /// CHECK: Initiator's settlement token account
    pub initiator_token_account: AccountInfo<'info>,
    /// CHECK: Settlement mint
    pub settlement_mint: AccountInfo<'info>,
    /// CHECK: Vault token account to be created
    pub vault: AccountInfo<'info>,
    /// CHECK: Game state to be created
    pub game_state: AccountInfo<'info>,
    /// CHECK: Pyth price update account
    pub price_update: AccountInfo<'info>,
    /// CHECK: Token program
    pub token_program: AccountInfo<'info>,
    /// CHECK: System program
    pub system_program: AccountInfo<'info>,
}

/// Account struct for CPI join game calls
#[derive(Accounts)]
pub struct CpiJoinGame<'info> {
    /// CHECK: Config account
    pub config: AccountInfo<'info>,
    /// CHECK: Challenger/signer
    pub challenger: AccountInfo<'info>,
    /// CHECK: Challenger's settlement token account
    pub challenger_token_account: AccountInfo<'info>,
    /// CHECK: Vault token account
    pub vault: AccountInfo<'info>,
    /// CHECK: Game state
    pub game_state: AccountInfo<'info>,
    /// CHECK: Pyth price update account
    pub price_update: AccountInfo<'info>,
    /// CHECK: Token program
    pub token_program: AccountInfo<'info>,
}

/// Account struct for CPI close game calls
#[derive(Accounts)]
pub struct CpiCloseGame<'info> {
    /// CHECK: Config account
    pub config: AccountInfo<'info>,
    /// CHECK: Winner/signer
    pub winner: AccountInfo<'info>,
    /// CHECK: Winner's settlement token account
    pub winner_token_account: AccountInfo<'info>,
    /// CHECK: Initiator (rent destination for the closed vault)
    pub initiator_account: AccountInfo<'info>,
    /// CHECK: Vault token account
    pub vault: AccountInfo<'info>,
    /// CHECK: Game state
    pub game_state: AccountInfo<'info>,
    /// CHECK: Pyth price update account
    pub price_update: AccountInfo<'info>,
    /// CHECK: Token program
    pub token_program: AccountInfo<'info>,
}

/// Account struct for CPI draw game calls
#[derive(Accounts)]
pub struct CpiDrawGame<'info> {
    /// CHECK: Config account
    pub config: AccountInfo<'info>,
    /// CHECK: Player/signer
    pub player: AccountInfo<'info>,
    /// CHECK: Initiator (rent destination for the closed vault)
    pub initiator_account: AccountInfo<'info>,
    /// CHECK: Initiator's settlement token account
    pub initiator_token_account: AccountInfo<'info>,
    /// CHECK: Challenger's settlement token account
    pub challenger_token_account: AccountInfo<'info>,
    /// CHECK: Vault token account
    pub vault: AccountInfo<'info>,
    /// CHECK: Game state
    pub game_state: AccountInfo<'info>,
    /// CHECK: Pyth price update account
    pub price_update: AccountInfo<'info>,
    /// CHECK: Token program
    pub token_program: AccountInfo<'info>,
}

/// Account struct for CPI cancel game calls
#[derive(Accounts)]
pub struct CpiCancelGame<'info> {
    /// CHECK: Config account
    pub config: AccountInfo<'info>,
    /// CHECK: Initiator/signer
    pub initiator: AccountInfo<'info>,
    /// CHECK: Initiator's settlement token account
    pub initiator_token_account: AccountInfo<'info>,
    /// CHECK: Vault token account
    pub vault: AccountInfo<'info>,
    /// CHECK: Game state
    pub game_state: AccountInfo<'info>,
    /// CHECK: Token program
    pub token_program: AccountInfo<'info>,
}

/// Derive the config PDA address
pub fn derive_config_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"config"], program_id)
}

/// Derive the game state PDA address for an (initiator, game_id) pair
pub fn derive_game_state_pda(
    initiator: &Pubkey,
    game_id: u64,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"game_state", initiator.as_ref(), &game_id.to_le_bytes()],
        program_id,
    )
}

/// Derive the game vault PDA address for an (initiator, game_id) pair
pub fn derive_game_vault_pda(
    initiator: &Pubkey,
    game_id: u64,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"game_vault", initiator.as_ref(), &game_id.to_le_bytes()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_and_vault_never_collide() {
        let initiator = Pubkey::new_unique();
        let (state, _) = derive_game_state_pda(&initiator, 7, &crate::ID);
        let (vault, _) = derive_game_vault_pda(&initiator, 7, &crate::ID);
        assert_ne!(state, vault);
    }

    #[test]
    fn derivations_are_scoped_by_initiator_and_game_id() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let (a7, _) = derive_game_state_pda(&alice, 7, &crate::ID);
        let (a8, _) = derive_game_state_pda(&alice, 8, &crate::ID);
        let (b7, _) = derive_game_state_pda(&bob, 7, &crate::ID);

        assert_ne!(a7, a8);
        assert_ne!(a7, b7);

        // Deterministic: the same tuple always lands on the same address.
        assert_eq!(a7, derive_game_state_pda(&alice, 7, &crate::ID).0);
    }
}
